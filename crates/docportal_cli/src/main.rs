/* 📖 # Why subcommands around one Site?

Every subcommand opens the same `Site` from the same configuration and then
asks it for something different: `serve` puts the HTTP service in front of it,
`list` and `search` print what `/api/search` would answer, `render` prints one
page and `export` writes all of them to disk. A bare `docportal` serves, so
running it inside a docs project is enough to preview it.

Paths in the configuration are relative to `--root` (default: the current
directory). `--host` and `--port` override the `[server]` table.

Exit codes:
- 0: Success
- 1: Error (invalid configuration, unreadable docs tree, port in use)
*/

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use docportal_base::pal::http::HttpServerConfig;
use docportal_base::tracing::init_tracing;
use docportal_base::{FilePath, PalHandle, PortalError, PortalResult, RealPal};
use docportal_engine::api::MAX_FEEDBACK_BODY_BYTES;
use docportal_engine::{
    CONFIG_FILE_NAME, Config, PortalService, Site, export_site, load_config,
};

#[derive(Debug, Parser)]
#[command(name = "docportal", version, about = "Localized, versioned documentation portal")]
struct Cli {
    /// Site root; configured directories are relative to it
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file, relative to the site root
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the site over HTTP (the default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the document listing as JSON
    List,
    /// Print the ids of documents matching a query
    Search { query: String },
    /// Print the HTML of one documentation page
    Render {
        locale: String,
        version: String,
        slug: String,
    },
    /// Write the whole site as static files
    Export {
        /// Output directory, relative to the site root
        #[arg(long, default_value = "out")]
        out: String,
    },
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> PortalResult<()> {
    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir().map_err(|e| Box::new(PortalError::file(".", e)))?,
    };
    let pal = PalHandle::new(RealPal::new(root));
    let config = load_config(&pal, &FilePath::from(cli.config.as_str()))?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(pal, config, host, port),
        Command::List => {
            let site = Site::open(pal, config)?;
            let documents = site.documents()?;
            let json = serde_json::to_string_pretty(&*documents)
                .map_err(|e| docportal_base::err!("JSON serialization error: {}", e))?;
            println!("{}", json);
            Ok(())
        }
        Command::Search { query } => {
            let site = Site::open(pal, config)?;
            for id in site.search(&query)? {
                println!("{}", id);
            }
            Ok(())
        }
        Command::Render {
            locale,
            version,
            slug,
        } => {
            let site = Site::open(pal, config)?;
            let page = site.doc_page(&locale, &version, &slug);
            if !page.found {
                eprintln!(
                    "No document for /{}/docs/{}/{}, printing the fallback page",
                    locale, version, slug
                );
            }
            println!("{}", page.html);
            Ok(())
        }
        Command::Export { out } => {
            let site = Site::open(pal, config)?;
            let summary = export_site(&site, &FilePath::from(out.as_str()))?;
            println!(
                "Exported {} pages ({} fallback) and {} files to {}",
                summary.pages, summary.fallback_pages, summary.files, out
            );
            Ok(())
        }
    }
}

fn serve(
    pal: PalHandle,
    config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> PortalResult<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let site = Arc::new(Site::open(pal.clone(), config)?);
    let service = PortalService::new(site);

    let server_config = HttpServerConfig::new(host.as_str())
        .with_port(port)
        .with_max_body_bytes(MAX_FEEDBACK_BODY_BYTES);
    let handle = pal.start_http_server(Box::new(service), server_config)?;
    info!(host = host.as_str(), port = handle.port(), "serving documentation");
    println!("Serving documentation at http://{}:{}/", host, handle.port());
    handle.wait();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_serve() {
        let cli = Cli::try_parse_from(["docportal"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "docportal.toml");
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docportal", "serve", "--port", "8080", "--root", "site",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        match cli.command {
            Some(Command::Serve { host, port }) => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from(["docportal", "render", "es", "v2", "installation"]).unwrap();
        match cli.command {
            Some(Command::Render { locale, version, slug }) => {
                assert_eq!(
                    (locale.as_str(), version.as_str(), slug.as_str()),
                    ("es", "v2", "installation")
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
