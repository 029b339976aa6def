use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use chat_api::{ChatApiClient, Role};
use nc_chatbot::logging::init_logging;
use nc_chatbot::{ChatRuntime, TurnController, TurnOutcome, WidgetConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = WidgetConfig::from_env().context("failed to load chat configuration")?;
    config.validate()?;

    let client = ChatApiClient::new(config.api_config())?;
    let runtime = ChatRuntime::new(
        TurnController::new(config.submission_context()),
        Arc::new(client),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let first = runtime.with_controller(|controller| controller.transcript().len());
        let mut view = TerminalView::new(first);
        let stdout = io::stdout();
        let mut render_error = None;

        let outcome = runtime
            .submit_observed(&line, |controller, _| {
                if render_error.is_some() {
                    return;
                }
                if let Err(error) = view.render(controller, &mut stdout.lock()) {
                    render_error = Some(error);
                }
            })
            .await;
        if let Some(error) = render_error {
            return Err(error).context("failed to write assistant output");
        }
        view.finish(&mut stdout.lock())?;

        if let TurnOutcome::Failed { error, .. } = outcome {
            eprintln!("error: {error}");
        }
    }

    Ok(())
}

/// Prints assistant text as it grows, one turn at a time.
///
/// Content is cumulative, so only the unseen suffix is written. A rewrite
/// that does not extend the printed text starts a fresh line.
#[derive(Debug, Default)]
struct TerminalView {
    first: usize,
    current: Option<(usize, String)>,
    cited: Vec<usize>,
    notice: Option<String>,
}

impl TerminalView {
    fn new(first: usize) -> Self {
        Self {
            first,
            ..Self::default()
        }
    }

    fn render(&mut self, controller: &TurnController, out: &mut impl Write) -> io::Result<()> {
        if let Some(notice) = controller.guardrail_notice() {
            if self.notice.as_deref() != Some(notice) {
                self.break_line(out)?;
                writeln!(out, "[guardrail: {notice}]")?;
                self.notice = Some(notice.to_owned());
            }
        }

        let messages = controller.transcript().messages();
        for (index, message) in messages.iter().enumerate().skip(self.first) {
            if message.role != Role::Assistant {
                continue;
            }

            let printed_index = self.current.as_ref().map(|(printed, _)| *printed);
            match printed_index {
                Some(printed) if printed > index => continue,
                Some(printed) if printed == index => {
                    let delta = self
                        .current
                        .as_ref()
                        .and_then(|(_, text)| message.content.strip_prefix(text.as_str()));
                    match delta {
                        Some(delta) => write!(out, "{delta}")?,
                        None => write!(out, "\n{}", message.content)?,
                    }
                }
                Some(_) => write!(out, "\n{}", message.content)?,
                None => write!(out, "{}", message.content)?,
            }
            self.current = Some((index, message.content.clone()));

            if let Some(citations) = &message.citations {
                if !message.streaming && !citations.is_empty() && !self.cited.contains(&index) {
                    writeln!(out)?;
                    for (number, citation) in citations.iter().enumerate() {
                        writeln!(out, "[{}] {} - {}", number + 1, citation.reference, citation.snippet)?;
                    }
                    self.cited.push(index);
                    self.current = None;
                    self.first = index + 1;
                }
            }
        }

        out.flush()
    }

    fn finish(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.break_line(out)?;
        out.flush()
    }

    fn break_line(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.current.take().is_some() {
            writeln!(out)?;
        }
        Ok(())
    }
}
