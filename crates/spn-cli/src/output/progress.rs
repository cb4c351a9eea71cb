//! Live build progress.
//!
//! On a terminal the whole table is redrawn in place every tick; otherwise a
//! line is printed only when a dependency changes state, so logs stay readable.

use std::collections::HashMap;
use std::io::{self, IsTerminal, Stdout, Write};

use spn_build::{BuildState, ProgressObserver, StatusSnapshot};
use spn_core::fit_width;

use super::colors::ColorSupport;

/// Width of the state column
const STATE_WIDTH: usize = 16;

/// Width of the free-form message column
const MESSAGE_WIDTH: usize = 48;

/// Renders coordinator snapshots as one row per dependency
pub struct BuildProgress<W: Write = Stdout> {
    out: W,
    colors: ColorSupport,
    interactive: bool,
    /// Rows drawn by the previous interactive frame
    drawn: usize,
    reported: HashMap<String, BuildState>,
}

impl BuildProgress<Stdout> {
    pub fn stdout(colors: ColorSupport) -> Self {
        let interactive = io::stdout().is_terminal() && colors.is_enabled();
        Self::new(io::stdout(), colors, interactive)
    }
}

impl<W: Write> BuildProgress<W> {
    pub fn new(out: W, colors: ColorSupport, interactive: bool) -> Self {
        Self {
            out,
            colors,
            interactive,
            drawn: 0,
            reported: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// One table row: name, short commit, state, then message or error
    pub fn render_row(&self, status: &StatusSnapshot) -> String {
        let state = fit_width(status.state.as_str(), STATE_WIDTH);
        let state = match status.state {
            BuildState::Done => self.colors.green(&state),
            BuildState::Failed | BuildState::Canceled => self.colors.red(&state),
            BuildState::Idle => self.colors.dim(&state),
            _ => self.colors.cyan(&state),
        };
        let detail = status.error.as_deref().unwrap_or(&status.message);
        let row = format!(
            "{} {:<8} {} {}",
            status.display_name,
            status.commit,
            state,
            fit_width(detail, MESSAGE_WIDTH)
        );
        row.trim_end().to_string()
    }

    fn redraw(&mut self, statuses: &[StatusSnapshot]) -> io::Result<()> {
        if self.drawn > 0 {
            write!(self.out, "\x1b[{}A", self.drawn)?;
        }
        for status in statuses {
            let row = self.render_row(status);
            writeln!(self.out, "\x1b[2K{}", row)?;
        }
        self.drawn = statuses.len();
        self.out.flush()
    }

    fn report_changes(&mut self, statuses: &[StatusSnapshot]) -> io::Result<()> {
        for status in statuses {
            if self.reported.get(&status.name) == Some(&status.state) {
                continue;
            }
            self.reported.insert(status.name.clone(), status.state);
            let row = self.render_row(status);
            writeln!(self.out, "{}", row)?;
        }
        self.out.flush()
    }

    fn draw(&mut self, statuses: &[StatusSnapshot]) {
        let result = if self.interactive {
            self.redraw(statuses)
        } else {
            self.report_changes(statuses)
        };
        if let Err(e) = result {
            tracing::debug!("Progress output failed: {}", e);
        }
    }
}

impl<W: Write> ProgressObserver for BuildProgress<W> {
    fn on_tick(&mut self, statuses: &[StatusSnapshot]) {
        self.draw(statuses);
    }

    fn on_settle(&mut self, statuses: &[StatusSnapshot]) {
        self.draw(statuses);
    }
}
