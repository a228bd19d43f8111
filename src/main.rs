use anyhow::Result;
use clap::Parser;
use log::{error, info};
use redraft::draft::ReportDraft;
use redraft::persist::SidecarStore;
use redraft::refine::{CommitOutcome, RefineDriver};
use redraft::rewrite_http::HttpRewriteService;
use redraft::section::Section;
use redraft::selection::{SelectionPoint, SelectionSpan, TextOffsetResolver};
use redraft::settings::Settings;
use redraft::view::SectionView;
use simplelog::{Config, LevelFilter, WriteLogger};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mark up a markdown report section by section and send the marked
/// passages through a rewrite service.
#[derive(Parser)]
#[command(name = "redraft", version)]
struct Args {
    /// Markdown report to work on
    report: PathBuf,

    /// Override the rewrite service endpoint
    #[arg(long)]
    rewrite_url: Option<String>,

    /// Wrap width used when showing a section
    #[arg(long)]
    width: Option<usize>,

    /// Keep section sidecars in this directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Run without persisting refinements
    #[arg(long)]
    ephemeral: bool,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the log
    #[arg(long, default_value = "redraft.log")]
    log_file: PathBuf,
}

struct App {
    draft: ReportDraft,
    driver: RefineDriver,
    current: usize,
    width: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(&args.log_file)?,
    )?;

    info!("Starting redraft");

    let settings = Settings::load_or_default(args.config.as_deref());

    let rewrite_url = args
        .rewrite_url
        .clone()
        .unwrap_or_else(|| settings.rewrite_url.clone());
    let mut service = HttpRewriteService::new(&rewrite_url, settings.request_timeout())?;
    let api_token = std::env::var("REDRAFT_API_TOKEN")
        .ok()
        .or_else(|| settings.api_token.clone());
    if let Some(token) = api_token {
        service = service.with_token(token);
    }

    let store = if args.ephemeral {
        Arc::new(SidecarStore::ephemeral())
    } else {
        let data_dir = args.data_dir.clone().or_else(|| settings.data_dir.clone());
        Arc::new(SidecarStore::for_report(&args.report, data_dir.as_deref())?)
    };

    let mut draft = ReportDraft::from_file(&args.report)?;
    store.restore_sections(&mut draft);

    let driver = RefineDriver::new(Arc::new(service)).with_store(store);
    let width = args.width.unwrap_or(settings.view_width).max(20);

    let mut app = App {
        draft,
        driver,
        current: 0,
        width,
    };
    let res = app.run().await;

    if let Err(err) = res {
        error!("Application error: {:?}", err);
        println!("{err:?}");
    }

    info!("Shutting down redraft");
    Ok(())
}

impl App {
    async fn run(&mut self) -> Result<()> {
        if self.draft.is_empty() {
            println!("No sections found in the report.");
            return Ok(());
        }

        self.cmd_sections();
        println!("Type 'help' for the command list.");

        let mut line = String::new();
        loop {
            print!("redraft> ");
            io::stdout().flush()?;
            line.clear();
            if io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            let (command, rest) = match input.split_once(' ') {
                Some((command, rest)) => (command, rest.trim()),
                None => (input, ""),
            };
            match command {
                "sections" | "ls" => self.cmd_sections(),
                "open" => self.cmd_open(rest),
                "show" => self.cmd_show(),
                "mark" => self.cmd_mark(rest),
                "note" => self.cmd_note(rest),
                "unmark" => self.cmd_unmark(rest),
                "marks" => self.cmd_marks(),
                "refine" => self.cmd_refine(rest).await,
                "back" => self.cmd_back(),
                "forward" => self.cmd_forward(),
                "restore" => self.cmd_restore(),
                "export" => self.cmd_export(rest),
                "help" => print_help(),
                "quit" | "exit" | "q" => break,
                _ => println!("Unknown command '{command}'. Type 'help' for the command list."),
            }
        }
        Ok(())
    }

    fn section(&self) -> &Section {
        &self.draft.sections()[self.current]
    }

    fn section_mut(&mut self) -> &mut Section {
        self.draft
            .section_mut(self.current)
            .expect("current section index out of range")
    }

    fn cmd_sections(&self) {
        for (idx, section) in self.draft.sections().iter().enumerate() {
            let marker = if idx == self.current { ">" } else { " " };
            let mut flags = String::new();
            if !section.highlights().is_empty() {
                flags.push_str(&format!(" [{} marks]", section.highlights().len()));
            }
            if !section.history().is_empty() {
                flags.push_str(&format!(" [{} revisions]", section.history().len()));
            }
            println!("{marker} {idx}: {}{flags}", section.title);
        }
    }

    fn cmd_open(&mut self, rest: &str) {
        match rest.parse::<usize>() {
            Ok(idx) if idx < self.draft.len() => {
                self.current = idx;
                self.cmd_show();
            }
            Ok(idx) => println!(
                "No section {idx}; the report has {} sections.",
                self.draft.len()
            ),
            Err(_) => println!("Usage: open <section number>"),
        }
    }

    fn cmd_show(&self) {
        let section = self.section();
        println!("== {} ==", section.title);

        let viewing_history = section.viewed_content() != section.content();
        if viewing_history {
            match section.viewed_revision() {
                Some(pos) => println!(
                    "(viewing revision {} of {}; 'restore' makes it current)",
                    pos + 1,
                    section.history().len()
                ),
                None => println!("(viewing the original draft; 'restore' makes it current)"),
            }
        }

        let view = SectionView::build(section.viewed_content(), self.width);
        for (idx, line) in view.lines().iter().enumerate() {
            println!("{:>4} | {}", idx + 1, line.text);
            if viewing_history {
                continue;
            }
            let ranges = view.line_annotation_ranges(idx, section.highlights());
            if ranges.is_empty() {
                continue;
            }
            let len = line.text.chars().count();
            let mut carets = vec![' '; len];
            for (from, to) in ranges {
                for caret in carets.iter_mut().take(to.min(len)).skip(from) {
                    *caret = '^';
                }
            }
            println!("     | {}", carets.into_iter().collect::<String>());
        }
    }

    /// `mark <line> <from> <to>` for one line, `mark <line> <col> <line>
    /// <col>` across lines. Lines and columns are 1-based as shown by
    /// `show`; the end column is included in the mark.
    fn cmd_mark(&mut self, rest: &str) {
        let numbers: Result<Vec<usize>, _> =
            rest.split_whitespace().map(|t| t.parse()).collect();
        let numbers = match numbers {
            Ok(n) => n,
            Err(_) => {
                println!("Usage: mark <line> <from> <to>  or  mark <line> <col> <line> <col>");
                return;
            }
        };
        let (start, end) = match numbers.as_slice() {
            [line, from, to] => (
                SelectionPoint::new(line.saturating_sub(1), from.saturating_sub(1)),
                SelectionPoint::new(line.saturating_sub(1), *to),
            ),
            [l1, c1, l2, c2] => (
                SelectionPoint::new(l1.saturating_sub(1), c1.saturating_sub(1)),
                SelectionPoint::new(l2.saturating_sub(1), *c2),
            ),
            _ => {
                println!("Usage: mark <line> <from> <to>  or  mark <line> <col> <line> <col>");
                return;
            }
        };

        if self.section().viewed_content() != self.section().content() {
            println!("Viewing an old revision; 'restore' it or go 'forward' before marking.");
            return;
        }

        let view = SectionView::build(self.section().content(), self.width);
        let range = match view.resolve(&SelectionSpan::new(start, end)) {
            Ok(range) => range,
            Err(e) => {
                println!("{e}");
                return;
            }
        };
        match self.section_mut().add_highlight(range) {
            Ok(id) => {
                if let Some(highlight) = self.section().highlight_by_id(id) {
                    println!(
                        "Marked \"{}\" in {}. 'note {}' attaches an instruction.",
                        highlight.text,
                        highlight.color.name(),
                        self.section().highlights().len()
                    );
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    fn cmd_note(&mut self, rest: &str) {
        let Some((number, text)) = rest.split_once(' ') else {
            println!("Usage: note <mark number> <instruction>");
            return;
        };
        let Ok(number) = number.parse::<usize>() else {
            println!("Usage: note <mark number> <instruction>");
            return;
        };
        let Some(highlight) = self
            .section()
            .highlights()
            .get(number.saturating_sub(1))
        else {
            println!("No mark {number}; 'marks' lists them.");
            return;
        };
        let id = highlight.id;
        self.section_mut()
            .set_highlight_note(id, Some(text.to_string()));
        println!("Noted.");
    }

    fn cmd_unmark(&mut self, rest: &str) {
        let Ok(number) = rest.parse::<usize>() else {
            println!("Usage: unmark <mark number>");
            return;
        };
        let Some(highlight) = self
            .section()
            .highlights()
            .get(number.saturating_sub(1))
        else {
            println!("No mark {number}; 'marks' lists them.");
            return;
        };
        let id = highlight.id;
        self.section_mut().remove_highlight(id);
        println!("Unmarked.");
    }

    fn cmd_marks(&self) {
        let section = self.section();
        if section.highlights().is_empty() {
            println!("No marks on this section.");
            return;
        }
        for (idx, highlight) in section.highlights().iter().enumerate() {
            let note = highlight.note.as_deref().unwrap_or("-");
            println!(
                "{}. [{}] \"{}\" note: {note}",
                idx + 1,
                highlight.color.name(),
                highlight.text
            );
        }
    }

    async fn cmd_refine(&mut self, rest: &str) {
        let instruction = if rest.is_empty() { None } else { Some(rest) };
        println!("Refining...");
        let Some(section) = self.draft.section_mut(self.current) else {
            return;
        };
        match self.driver.refine(section, instruction).await {
            Ok(CommitOutcome::Committed) => {
                println!("Refined.");
                self.cmd_show();
            }
            Ok(CommitOutcome::StaleDiscarded) => {
                println!("The section changed while refining; the result was discarded.");
            }
            Err(e) => println!("Refinement failed: {e}"),
        }
    }

    fn cmd_back(&mut self) {
        if self.section_mut().history_back() {
            self.cmd_show();
        } else {
            println!("Already at the original draft.");
        }
    }

    fn cmd_forward(&mut self) {
        if self.section_mut().history_forward() {
            self.cmd_show();
        } else {
            println!("Already at the newest revision.");
        }
    }

    fn cmd_restore(&mut self) {
        if self.section_mut().restore_viewed_revision() {
            println!("Restored; marks were cleared.");
            self.cmd_show();
        } else {
            println!("Already viewing the current content.");
        }
    }

    fn cmd_export(&self, rest: &str) {
        if rest.is_empty() {
            println!("Usage: export <path>");
            return;
        }
        match self.draft.export(Path::new(rest)) {
            Ok(()) => println!("Exported to {rest}."),
            Err(e) => println!("Export failed: {e:?}"),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  sections              list sections ('ls' works too)");
    println!("  open <n>              switch to section n");
    println!("  show                  print the current section");
    println!("  mark <l> <from> <to>  mark columns from..to of line l");
    println!("  mark <l> <c> <l> <c>  mark across lines");
    println!("  note <k> <text>       attach an instruction to mark k");
    println!("  unmark <k>            remove mark k");
    println!("  marks                 list marks on this section");
    println!("  refine [instruction]  rewrite the section's marked passages");
    println!("  back / forward        walk the revision history");
    println!("  restore               make the viewed revision current");
    println!("  export <path>         write the assembled report");
    println!("  quit                  exit");
}
