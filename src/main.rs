use std::io::{self, IsTerminal, Read};

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "capshala",
    version,
    about = "Compose caption images and share them through the caption API"
)]
struct Cli {
    /// Caption text (read from stdin when omitted)
    #[arg(short = 't', long = "text")]
    text: Option<String>,

    /// Caption language (english, urdu, roman)
    #[arg(short = 'l', long = "language", default_value = "english")]
    language: String,

    /// Category tag stored with the caption
    #[arg(short = 'c', long = "category")]
    category: Option<String>,

    /// Source image to burn the caption into
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Write the composed image to this path
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output image mime type (image/jpeg, image/png, image/webp, image/bmp)
    #[arg(long = "output-mime", default_value = "image/jpeg")]
    output_mime: String,

    /// Caption font size in pixels (20-100)
    #[arg(long = "font-size", default_value_t = 40.0)]
    font_size: f32,

    /// Caption fill color (hex, overrides settings)
    #[arg(long = "color")]
    color: Option<String>,

    /// Vertical anchor as a percentage from the top (0-100)
    #[arg(long = "position", default_value_t = 50.0)]
    position: f32,

    /// Disable the black outline behind caption text
    #[arg(long = "no-shadow")]
    no_shadow: bool,

    /// Submit the caption to a running server at this base URL
    #[arg(short = 'p', long = "post")]
    post: Option<String>,

    /// Run the caption REST API server
    #[arg(long = "serve")]
    serve: bool,

    /// Listen address for --serve (overrides settings)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    capshala::logging::init(cli.verbose)?;

    if cli.serve {
        let settings_path = cli.read_settings.as_deref().map(std::path::Path::new);
        let settings = capshala::settings::load_settings(settings_path)?;
        let addr = cli.addr.unwrap_or_else(|| settings.server_addr.clone());
        return capshala::server::run_server(settings, addr).await;
    }

    let input = if cli.text.is_none() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let output = capshala::run(
        capshala::Config {
            text: cli.text,
            language: cli.language,
            category: cli.category,
            data: cli.data,
            output: cli.output,
            output_mime: cli.output_mime,
            font_size: cli.font_size,
            color: cli.color,
            position: cli.position,
            no_shadow: cli.no_shadow,
            post: cli.post,
            settings_path: cli.read_settings,
        },
        input,
    )
    .await?;

    println!("{}", output);
    Ok(())
}
