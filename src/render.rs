use crate::vm::disp::{Display, DisplayWidget, DISPLAY_HEIGHT, DISPLAY_WIDTH};

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders},
};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use std::io::{self, stdout};

type Terminal = tui::Terminal<CrosstermBackend<io::Stdout>>;

// the framebuffer is half-block rendered, so two pixel rows per cell row,
// plus a one-cell border on every side
const DISPLAY_WINDOW_WIDTH: u16 = DISPLAY_WIDTH as u16 + 2;
const DISPLAY_WINDOW_HEIGHT: u16 = DISPLAY_HEIGHT as u16 / 2 + 2;

pub struct Renderer {
    terminal: Terminal,
    title: String,
    logging: bool,
}

impl Renderer {
    /// Switches the terminal to the alternate screen in raw mode and takes
    /// ownership of it until `exit`.
    pub fn setup(program_name: &str, logging: bool) -> Result<Renderer> {
        enable_raw_mode().context("Failed to enable terminal raw mode")?;

        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)
            .context("Failed to enter alternate terminal screen")?;

        let terminal = tui::Terminal::new(CrosstermBackend::new(stdout))
            .context("Failed to create interface to terminal backend")?;

        Ok(Renderer {
            terminal,
            title: format!(" {} ", program_name),
            logging,
        })
    }

    pub fn draw(&mut self, display: &Display) -> Result<()> {
        let title = self.title.as_str();
        let logging = self.logging;

        self.terminal.draw(|f| {
            let area = f.size();

            let [display_column, logger_column] = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(DISPLAY_WINDOW_WIDTH),
                    Constraint::Length(area.width.saturating_sub(DISPLAY_WINDOW_WIDTH)),
                ])
                .split(area)[..] else { unreachable!() };

            let display_block = Block::default().title(title).borders(Borders::ALL);
            let display_area = tui::layout::Rect {
                height: display_column.height.min(DISPLAY_WINDOW_HEIGHT),
                ..display_column
            };
            f.render_widget(DisplayWidget { display }, display_block.inner(display_area));
            f.render_widget(display_block, display_area);

            if logging {
                f.render_widget(logger_widget(), logger_column);
            }
        })?;

        Ok(())
    }

    /// Restores the terminal so its usable after program exit.
    pub fn exit(mut self) -> Result<()> {
        disable_raw_mode().context("Failed to disable terminal raw mode")?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate terminal screen")?;
        self.terminal
            .show_cursor()
            .context("Failed to show terminal cursor")?;
        Ok(())
    }
}

fn logger_widget() -> TuiLoggerWidget<'static> {
    TuiLoggerWidget::default()
        .block(
            Block::default()
                .title(" Log ")
                .border_style(Style::default().fg(Color::White))
                .borders(Borders::ALL),
        )
        .output_separator('|')
        .output_timestamp(Some("%H:%M:%S%.3f".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false)
        .style_error(Style::default().fg(Color::Red))
        .style_debug(Style::default().fg(Color::Cyan))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_trace(Style::default().fg(Color::White))
        .style_info(Style::default().fg(Color::Green))
}
