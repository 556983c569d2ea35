use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::board::{self, Post, SortOrder};
use crate::config;
use crate::data::{self, BoardService};
use crate::logging;
use crate::pages::{self, Route};
use crate::sheet;
use crate::ui;

pub const HELP: &str = "recruit-board — Browse research participant recruitment postings.

  --print              Print the board to stdout and exit
  --sort <ORDER>       Initial order: oldest (posting order) or newest
  --file <PATH>        Read the CSV export from a local file
  --config <PATH>      Use this config file instead of the default
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub csv_file: Option<PathBuf>,
    pub sort: Option<SortOrder>,
    pub print: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Version,
    Help,
    Run(RunOptions),
}

pub fn parse_args<I, S>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut opts = RunOptions::default();
    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(Command::Version),
            "--help" | "-h" => return Ok(Command::Help),
            "--print" => opts.print = true,
            "--sort" => {
                let value = args.next().context("--sort requires a value")?;
                opts.sort = Some(value.parse::<SortOrder>()?);
            }
            "--file" => {
                let value = args.next().context("--file requires a path")?;
                opts.csv_file = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = args.next().context("--config requires a path")?;
                opts.config_file = Some(PathBuf::from(value));
            }
            other => bail!("unknown argument {other:?} (see --help)"),
        }
    }
    Ok(Command::Run(opts))
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let target = match (opts.print, cfg.log.file.as_deref()) {
        (false, Some(path)) => Some(logging::Target::File(path)),
        (true, _) => Some(logging::Target::Stderr),
        (false, None) => None,
    };
    if let Some(target) = target {
        if let Err(err) = logging::init(&cfg.log, target) {
            eprintln!("warning: logging disabled: {err:#}");
        }
    }

    let service = build_service(&cfg, opts.csv_file.clone())?;
    let sort = opts.sort.unwrap_or(cfg.ui.default_sort);
    info!(source = %service.describe(), %sort, print = opts.print, "starting");

    if opts.print {
        let posts = service.load_posts()?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_board(&mut out, &posts, sort).context("write board")?;
        return Ok(());
    }

    let mut model = ui::Model::new(ui::Options {
        service,
        default_sort: sort,
        links: cfg.links.form_links(),
        initial_route: Route::Home,
    });
    model.run()
}

fn build_service(cfg: &config::Config, csv_file: Option<PathBuf>) -> Result<Arc<dyn BoardService>> {
    if let Some(path) = csv_file {
        return Ok(Arc::new(data::FileBoardService::new(path)));
    }
    let client = sheet::Client::new(sheet::ClientConfig {
        url: cfg.sheet.url.clone(),
        user_agent: cfg.sheet.user_agent.clone(),
        timeout: cfg.sheet.timeout,
        http_client: None,
    })
    .context("initialize sheet client")?;
    Ok(Arc::new(data::SheetBoardService::new(Arc::new(client))))
}

/// Plain-text rendering of the board, used by `--print`.
pub fn write_board<W: Write>(out: &mut W, posts: &[Post], sort: SortOrder) -> io::Result<()> {
    writeln!(
        out,
        "{} ({})",
        pages::count_label(posts.len()),
        pages::sort_label(sort)
    )?;
    let view = board::sorted_view(posts, sort);
    if view.is_empty() {
        writeln!(out, "{}", pages::EMPTY_BOARD)?;
        return Ok(());
    }
    for entry in view {
        writeln!(out)?;
        writeln!(out, "#{}  {}", entry.display_number, entry.post.timestamp)?;
        writeln!(out, "{}", entry.post.title)?;
        for line in entry.post.details.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(origin_index: usize, title: &str) -> Post {
        Post {
            origin_index,
            timestamp: format!("2024-01-0{}", origin_index + 1),
            title: title.into(),
            details: "Paid\n60 min".into(),
        }
    }

    #[test]
    fn parses_flags() {
        let cmd = parse_args(["--print", "--sort", "newest", "--file", "board.csv"]).unwrap();
        assert_eq!(
            cmd,
            Command::Run(RunOptions {
                config_file: None,
                csv_file: Some(PathBuf::from("board.csv")),
                sort: Some(SortOrder::Newest),
                print: true,
            })
        );
        assert_eq!(parse_args(["-V"]).unwrap(), Command::Version);
        assert_eq!(parse_args(["--help"]).unwrap(), Command::Help);
        assert_eq!(
            parse_args(Vec::<String>::new()).unwrap(),
            Command::Run(RunOptions::default())
        );
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(parse_args(["--sort"]).is_err());
        assert!(parse_args(["--sort", "sideways"]).is_err());
        assert!(parse_args(["--bogus"]).is_err());
    }

    #[test]
    fn writes_board_newest_first() {
        let posts = vec![post(0, "Study A"), post(1, "Study B")];
        let mut out = Vec::new();
        write_board(&mut out, &posts, SortOrder::Newest).unwrap();
        let text = String::from_utf8(out).unwrap();
        let b = text.find("#2  2024-01-02\nStudy B").unwrap();
        let a = text.find("#1  2024-01-01\nStudy A").unwrap();
        assert!(b < a);
        assert!(text.starts_with("2件の募集 (新着順)"));
        assert!(text.contains("    60 min"));
    }

    #[test]
    fn writes_empty_board() {
        let mut out = Vec::new();
        write_board(&mut out, &[], SortOrder::Oldest).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(pages::EMPTY_BOARD));
    }
}
