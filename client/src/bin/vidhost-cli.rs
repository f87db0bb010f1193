use eyre::{Context, bail};
use std::io::IsTerminal;
use std::path::Path;
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vidhost_client::{ClientConfig, VideoClient, VideoProperties, VideoQuery};

const USAGE: &str = "\
usage: vidhost-cli <command>

commands:
  upload <file> [video-id]   upload a file, into a new video unless an ID is given
  get <video-id>             show one video
  search [title]             list videos, optionally filtered by title
  delete <video-id>          delete a video

environment:
  VIDHOST_ACCESS_TOKEN       bearer token for the API (required)
  VIDHOST_BASE_URL           API endpoint (default https://ws.api.video)
  VIDHOST_CHUNK_SIZE         upload chunk size in bytes (default 64 MiB)";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Upload { file: &'a str, video_id: Option<&'a str> },
    Get { video_id: &'a str },
    Search { title: Option<&'a str> },
    Delete { video_id: &'a str },
}

impl<'a> Command<'a> {
    fn parse(args: &[&'a str]) -> Option<Self> {
        Some(match *args {
            ["upload", file] => Self::Upload { file, video_id: None },
            ["upload", file, video_id] => Self::Upload {
                file,
                video_id: Some(video_id),
            },
            ["get", video_id] => Self::Get { video_id },
            ["search"] => Self::Search { title: None },
            ["search", title] => Self::Search { title: Some(title) },
            ["delete", video_id] => Self::Delete { video_id },
            _ => return None,
        })
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{USAGE}");
        bail!("unrecognized arguments: {args:?}");
    };

    let config = ClientConfig::from_env().context("load configuration")?;
    let token = std::env::var("VIDHOST_ACCESS_TOKEN")
        .context("VIDHOST_ACCESS_TOKEN must hold an API access token")?;
    let client = VideoClient::new(config, token)?;

    match command {
        Command::Upload { file, video_id } => {
            let video = client
                .upload(Path::new(file), VideoProperties::default(), video_id)
                .await
                .with_context(|| format!("upload {file}"))?;
            match video {
                Some(video) => print_json(&video)?,
                None => eprintln!("upload finished, but the server sent no final video record"),
            }
        }
        Command::Get { video_id } => {
            let video = client.get(video_id).await?;
            print_json(&video)?;
        }
        Command::Search { title } => {
            let query = match title {
                Some(title) => VideoQuery::titled(title),
                None => VideoQuery::default(),
            };
            let mut videos = std::pin::pin!(client.search(query));
            while let Some(video) = videos.next().await {
                let video = video.context("fetch video")?;
                println!("{}\t{}", video.video_id, video.title);
            }
        }
        Command::Delete { video_id } => {
            client.delete(video_id).await?;
            eprintln!("deleted {video_id}");
        }
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}
