// TUI module for rendering the terminal interface
pub mod colors;
pub mod helpers;
pub mod input;

// Re-exports
pub use colors::*;
pub use helpers::{calculate_progress, format_file_size, spinner_frame};
pub use input::{handle_key_event, route_key, KeyAction};

use crate::async_preview::PreviewState;
use crate::domain::ImageEntry;
use crate::preview::{CellSize, RenderedImage};
use crate::session::{Session, StatusLevel};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

/// UI view state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Main image browsing view
    Browsing,
    /// Help overlay visible
    Help,
    /// Welcome screen shown on first launch
    Welcome,
}

/// Renders the viewer with the current image preview.
///
/// `tick` drives the loading spinner.
pub fn render_with_preview(frame: &mut Frame, session: &mut Session, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header with progress
            Constraint::Min(0),    // Image
            Constraint::Length(1), // Status line
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    let block = image_block();
    let inner = block.inner(chunks[1]);

    // May skip undecodable images, so it runs before anything reads the cursor
    let state = session.preview(CellSize::new(inner.width, inner.height));

    render_header(frame, chunks[0], session, &state);
    render_image_pane(frame, chunks[1], session.viewer().current(), &state, tick);
    render_status_line(frame, chunks[2], session);
    render_footer(frame, chunks[3]);
}

/// Renders the help overlay
pub fn render_help_overlay(frame: &mut Frame) {
    let area = frame.area();
    let help_area = centered_rect(50, 70, area);

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .title(" Help ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT_HIGHLIGHT))
        .style(Style::default().bg(BG_DARK));

    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let help_lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(ACCENT_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  → ", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("or "),
            Span::styled("l/Space", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("  Next image"),
        ]),
        Line::from(vec![
            Span::styled("  ← ", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("or "),
            Span::styled("h", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("        Previous image"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Enter", Style::default().fg(ACCENT_SECONDARY)),
            Span::raw("        Copy to shortlist"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  q ", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("or "),
            Span::styled("Esc", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("      Quit"),
        ]),
        Line::from(vec![
            Span::styled("  ?", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("            Toggle help"),
        ]),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? or Esc to close",
            Style::default().fg(TEXT_SECONDARY),
        )),
    ];

    let paragraph = Paragraph::new(help_lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_PRIMARY));

    frame.render_widget(paragraph, inner);
}

/// Renders the welcome dialog overlay
pub fn render_welcome_overlay(frame: &mut Frame, output_dir: &std::path::Path) {
    let area = centered_rect(80, 70, frame.area());

    frame.render_widget(Clear, area);

    let welcome_lines = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "Welcome to shortlist!",
            Style::default()
                .fg(ACCENT_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(vec![Span::raw(
            "Flip through your photos and copy the keepers into a shortlist folder.",
        )]),
        Line::from(vec![Span::raw(
            "Originals are never moved or changed, and your place is saved as you go.",
        )]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  ← / →  ", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("    Browse images"),
        ]),
        Line::from(vec![
            Span::styled("  Enter  ", Style::default().fg(ACCENT_SECONDARY)),
            Span::raw("    Copy the image to "),
            Span::styled(
                output_dir.display().to_string(),
                Style::default().fg(ACCENT_SECONDARY),
            ),
        ]),
        Line::from(vec![
            Span::styled("  ?      ", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("    Help"),
        ]),
        Line::from(vec![
            Span::styled("  q      ", Style::default().fg(TEXT_SECONDARY)),
            Span::raw("    Quit and remember the position"),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to start",
            Style::default()
                .fg(TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT_HIGHLIGHT))
        .style(Style::default().bg(BG_DARK));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(welcome_lines)
        .alignment(Alignment::Left)
        .style(Style::default().fg(TEXT_PRIMARY))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, inner);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// A `width` x `height` rect centered in `area`, shrunk to fit
fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn image_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
}

/// Renders the header with position, file details and a progress bar
fn render_header(frame: &mut Frame, area: Rect, session: &Session, state: &PreviewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(area);

    let viewer = session.viewer();
    let total = viewer.len();
    let index = viewer.cursor().unwrap_or(0);

    let (title_text, image_info) = if let Some(image) = viewer.current() {
        let mut details = format!(
            "({} • {}",
            format_file_size(image.size),
            image.format.label()
        );
        if let PreviewState::Ready(rendered) = state {
            details.push_str(&format!(" • {}x{}", rendered.original.0, rendered.original.1));
        }
        details.push(')');

        (
            format!(" Image {}/{} ", index + 1, total),
            vec![
                Span::styled(
                    image.name.clone(),
                    Style::default()
                        .fg(TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(details, Style::default().fg(TEXT_SECONDARY)),
            ],
        )
    } else {
        (
            " shortlist ".to_string(),
            vec![Span::styled(
                "No images to show",
                Style::default().fg(TEXT_SECONDARY),
            )],
        )
    };

    let title_line = Line::from(vec![Span::styled(
        title_text,
        Style::default()
            .fg(ACCENT_HIGHLIGHT)
            .add_modifier(Modifier::BOLD),
    )]);

    let header = Paragraph::new(vec![title_line, Line::from(image_info)])
        .block(
            Block::default()
                .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR)),
        )
        .alignment(Alignment::Left);

    frame.render_widget(header, chunks[0]);

    let progress = if viewer.current().is_some() {
        calculate_progress(index, total)
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::BOTTOM | Borders::LEFT | Borders::RIGHT)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR)),
        )
        .gauge_style(Style::default().fg(ACCENT_SECONDARY).bg(BG_DARK))
        .ratio(progress)
        .label(format!("{}%", (progress * 100.0) as u16));

    frame.render_widget(gauge, chunks[1]);
}

/// Renders the image, a loading indicator or the decode error
fn render_image_pane(
    frame: &mut Frame,
    area: Rect,
    image: Option<&ImageEntry>,
    state: &PreviewState,
    tick: usize,
) {
    // Nothing is current outside `Displaying`
    let Some(image) = image else {
        frame.render_widget(image_block(), area);
        return;
    };

    let block = image_block();
    let inner = block.inner(area);

    match state {
        PreviewState::Ready(rendered) => {
            frame.render_widget(block, area);
            render_halfblocks(frame, inner, rendered);
        }
        PreviewState::Loading => {
            frame.render_widget(block, area);

            let lines = vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} ", spinner_frame(tick)),
                        Style::default().fg(ACCENT_HIGHLIGHT),
                    ),
                    Span::styled("Loading ", Style::default().fg(TEXT_SECONDARY)),
                    Span::styled(image.name.clone(), Style::default().fg(TEXT_PRIMARY)),
                ]),
            ];
            let loading = Paragraph::new(lines).alignment(Alignment::Center);
            frame.render_widget(loading, centered_fixed(inner.width, 1, inner));
        }
        PreviewState::Error(reason) => {
            let error_lines: Vec<Line> = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  [!] Cannot display image",
                    Style::default()
                        .fg(ACCENT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("  {}", reason)),
                Line::from(""),
                Line::from(format!("  File: {}", image.name)),
                Line::from(format!("  Path: {}", image.path.display())),
                Line::from(format!("  Size: {}", format_file_size(image.size))),
            ];

            let paragraph = Paragraph::new(error_lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(ACCENT_PRIMARY))
                        .title(format!(" {} [!] ", image.name)),
                )
                .style(Style::default().fg(TEXT_PRIMARY))
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
    }
}

fn render_halfblocks(frame: &mut Frame, area: Rect, rendered: &RenderedImage) {
    let target = centered_fixed(rendered.cell_width(), rendered.cell_height(), area);
    frame.render_widget(Paragraph::new(rendered.lines.clone()), target);
}

/// Last status message on the left, copy counters on the right
fn render_status_line(frame: &mut Frame, area: Rect, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(32)])
        .split(area);

    if let Some(status) = session.status() {
        let color = match status.level {
            StatusLevel::Info => TEXT_SECONDARY,
            StatusLevel::Success => ACCENT_SECONDARY,
            StatusLevel::Warning => ACCENT_WARNING,
            StatusLevel::Error => ACCENT_PRIMARY,
        };
        let message = Paragraph::new(Line::from(Span::styled(
            format!(" {}", status.text),
            Style::default().fg(color),
        )));
        frame.render_widget(message, chunks[0]);
    }

    let mut counters = vec![
        Span::styled("Shortlisted ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled(
            session.copied().to_string(),
            Style::default()
                .fg(ACCENT_SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    let pending = session.copies_pending();
    if pending > 0 {
        counters.push(Span::styled(
            format!("  ({} copying)", pending),
            Style::default().fg(TEXT_SECONDARY),
        ));
    }
    counters.push(Span::raw(" "));

    let counter_line = Paragraph::new(Line::from(counters)).alignment(Alignment::Right);
    frame.render_widget(counter_line, chunks[1]);
}

/// Renders the footer with styled controls
fn render_footer(frame: &mut Frame, area: Rect) {
    let controls = Line::from(vec![
        Span::styled(
            " ← ",
            Style::default()
                .fg(TEXT_SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("Prev", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled(
            "→ ",
            Style::default()
                .fg(TEXT_SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("Next", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled(
            "Enter ",
            Style::default()
                .fg(ACCENT_SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("Shortlist", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("? ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled("Help", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("q ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled("Quit", Style::default().fg(TEXT_SECONDARY)),
    ]);

    let footer = Paragraph::new(controls)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(footer, area);
}
