use std::io::BufRead;

use deen_core::line::decode_line;
use deen_types::{DictStats, MainState, UiCommand, UiEvent, UpdateStatus};
use kanal::{AsyncReceiver, AsyncSender};
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
pub struct UiOptions {
    /// Matches printed per search
    pub max_results: usize,
    /// Exit after the first answer
    pub one_shot: bool,
    /// Ask for a random entry as soon as the dictionary is ready
    pub random_on_ready: bool,
    /// Bold the matched text with ANSI escapes
    pub highlight: bool,
}

/// A line for the terminal. Results go to stdout, everything else to stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Result(String),
    Notice(String),
}

/// Turns controller notifications into terminal lines
pub struct Renderer {
    options: UiOptions,
    stats: DictStats,
    announced_ready: bool,
}

impl Renderer {
    pub fn new(options: UiOptions) -> Self {
        Self {
            options,
            stats: DictStats::default(),
            announced_ready: false,
        }
    }

    pub fn render(&mut self, event: &UiEvent) -> Vec<Output> {
        match event {
            UiEvent::State(MainState::AwaitingDict) => {
                vec![Output::Notice("Loading dictionary...".to_string())]
            }
            UiEvent::State(MainState::Ready) if !self.announced_ready => {
                self.announced_ready = true;
                vec![Output::Notice(format!(
                    "Dictionary ready: {}",
                    describe_stats(&self.stats)
                ))]
            }
            UiEvent::State(_) => Vec::new(),
            UiEvent::DictProgress(percent) => {
                vec![Output::Notice(format!("Loading dictionary: {percent:.0}%"))]
            }
            UiEvent::SearchProgress(percent) => {
                vec![Output::Notice(format!("Searching: {percent:.0}%"))]
            }
            UiEvent::Stats { stats, updating } => {
                self.stats = *stats;
                match updating {
                    Some(UpdateStatus::Loading) => {
                        vec![Output::Notice("Updating dictionary in the background...".to_string())]
                    }
                    Some(UpdateStatus::Done) => vec![Output::Notice(format!(
                        "Dictionary updated: {}",
                        describe_stats(stats)
                    ))],
                    Some(UpdateStatus::Error) => vec![Output::Notice(
                        "Dictionary update failed, still using the previous version".to_string(),
                    )],
                    None => Vec::new(),
                }
            }
            UiEvent::ShowResults {
                query,
                pattern,
                matches,
                cached,
            } => {
                if query.is_empty() {
                    return Vec::new();
                }
                if *cached {
                    tracing::debug!("Showing cached results for {query:?}");
                }
                self.render_results(pattern, matches)
            }
            UiEvent::ShowRandom(line) => render_line(line, None),
            UiEvent::Rejected { reason, .. } => vec![Output::Notice(reason.clone())],
            UiEvent::Fatal(message) => vec![Output::Notice(format!("Error: {message}"))],
            UiEvent::Shutdown => Vec::new(),
        }
    }

    fn render_results(&self, pattern: &str, matches: &[String]) -> Vec<Output> {
        let highlighter = if self.options.highlight && !pattern.is_empty() {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| tracing::warn!("Cannot highlight with /{pattern}/: {e}"))
                .ok()
        } else {
            None
        };

        let shown = matches.len().min(self.options.max_results);
        let mut out: Vec<Output> = matches[..shown]
            .iter()
            .flat_map(|line| render_line(line, highlighter.as_ref()))
            .collect();
        out.push(Output::Notice(result_summary(
            matches.len(),
            shown,
            self.stats.lines,
        )));
        out
    }

    /// Whether a one-shot run is complete after this event
    pub fn is_final(event: &UiEvent) -> bool {
        matches!(
            event,
            UiEvent::ShowResults { .. }
                | UiEvent::ShowRandom(_)
                | UiEvent::Rejected { .. }
                | UiEvent::Fatal(_)
        )
    }
}

fn describe_stats(stats: &DictStats) -> String {
    match stats.one_to_one {
        Some(n) => format!(
            "{} lines, {} entries, {} 1:1 translations",
            stats.lines, stats.entries, n
        ),
        None => format!("{} lines, {} entries", stats.lines, stats.entries),
    }
}

pub fn result_summary(total: usize, shown: usize, dict_lines: usize) -> String {
    if total == 0 {
        format!("No matches found (dictionary holds {dict_lines} entries).")
    } else if shown != total {
        format!("Found {total} matches, showing the first {shown}.")
    } else {
        format!("Showing all {total} matches.")
    }
}

fn highlight(text: &str, re: Option<&Regex>) -> String {
    match re {
        Some(re) => re.replace_all(text, "\x1b[1m$0\x1b[0m").into_owned(),
        None => text.to_string(),
    }
}

/// One output line per German/English pair, sub-entries indented
fn render_line(line: &str, re: Option<&Regex>) -> Vec<Output> {
    match decode_line(line) {
        Ok(pairs) => pairs
            .iter()
            .enumerate()
            .map(|(i, (de, en))| {
                let indent = if i == 0 { "" } else { "    " };
                Output::Result(format!(
                    "{indent}{}  ::  {}",
                    highlight(de, re),
                    highlight(en, re)
                ))
            })
            .collect(),
        Err(e) => {
            tracing::warn!("{e}");
            vec![Output::Result(line.to_string())]
        }
    }
}

/// Prints controller notifications. In one-shot mode returns after the
/// first answer, with an error if that answer was a failure.
pub async fn ui_loop(
    app_to_ui_rx: AsyncReceiver<UiEvent>,
    ui_to_app_tx: AsyncSender<UiCommand>,
    options: UiOptions,
) -> anyhow::Result<()> {
    let one_shot = options.one_shot;
    let mut random_pending = options.random_on_ready;
    let mut renderer = Renderer::new(options);

    while let Ok(event) = app_to_ui_rx.recv().await {
        if event == UiEvent::Shutdown {
            break;
        }
        if random_pending && event == UiEvent::State(MainState::Ready) {
            random_pending = false;
            ui_to_app_tx.send(UiCommand::Random).await?;
        }

        for output in renderer.render(&event) {
            match output {
                Output::Result(line) => println!("{line}"),
                Output::Notice(line) => eprintln!("{line}"),
            }
        }

        if one_shot && Renderer::is_final(&event) {
            if let UiEvent::Fatal(message) = event {
                anyhow::bail!(message);
            }
            // the controller may already be gone
            let _ = ui_to_app_tx.send(UiCommand::Quit).await;
            return Ok(());
        }
    }
    Ok(())
}

/// Parse one line of interactive input
pub fn parse_command(line: &str) -> Option<UiCommand> {
    let line = line.trim();
    match line {
        ":q" | ":quit" => Some(UiCommand::Quit),
        ":b" | ":back" => Some(UiCommand::Back),
        ":f" | ":fwd" => Some(UiCommand::Forward),
        ":r" | ":rand" => Some(UiCommand::Random),
        ":s" | ":status" => Some(UiCommand::Status),
        _ if line.starts_with(':') => {
            tracing::warn!("Unknown command {line}");
            None
        }
        _ => Some(UiCommand::Search(line.to_string())),
    }
}

/// Read commands from stdin on a plain thread, since a blocking stdin read
/// cannot be cancelled. End of input asks the controller to quit.
pub fn spawn_stdin_reader(ui_to_app_tx: AsyncSender<UiCommand>) -> std::thread::JoinHandle<()> {
    let runtime = tokio::runtime::Handle::current();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {e}");
                    break;
                }
            };
            let Some(cmd) = parse_command(&line) else {
                continue;
            };
            if runtime.block_on(ui_to_app_tx.send(cmd)).is_err() {
                return;
            }
        }
        let _ = runtime.block_on(ui_to_app_tx.send(UiCommand::Quit));
    })
}
