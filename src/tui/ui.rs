//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::isa::{format_binary, StatusFlag, REGISTER_COUNT};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, control unit and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(9),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_control_unit(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: registers, memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10),
            Constraint::Min(6),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_registers(frame, right_chunks[0], app);
    draw_memory(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly view.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:02X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Program ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw control unit state: instruction, phase, PC, IR, SR and port B.
fn draw_control_unit(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let snap = app.cu.snapshot();
    let value = Style::default().fg(Color::White);

    let flags: Vec<Span> = StatusFlag::ALL
        .iter()
        .map(|flag| {
            let style = if snap.status & flag.mask() != 0 {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(flag.letter().to_string(), style)
        })
        .collect();

    let mut sr_line = vec![Span::raw("SR:  ")];
    sr_line.extend(flags);

    let content = vec![
        Line::from(vec![
            Span::raw("Instruction: "),
            Span::styled(snap.opcode_name.clone(), Style::default().fg(Color::Yellow)),
            Span::raw("   State: "),
            Span::styled(snap.state_name.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:02X}", snap.program_counter), value),
            Span::raw("   MAR: "),
            Span::styled(format!("{:02X}", snap.memory_address), value),
            Span::raw("   SP: "),
            Span::styled(format!("{}", snap.stack_pointer), value),
        ]),
        Line::from(vec![
            Span::raw("IR:  "),
            Span::styled(
                format!(
                    "{} {} {}",
                    format_binary(snap.fields.opcode as u32, 8),
                    format_binary(snap.fields.operand1 as u32, 8),
                    format_binary(snap.fields.operand2 as u32, 8),
                ),
                value,
            ),
        ]),
        Line::from(sr_line),
        Line::from(vec![
            Span::raw("DDRB:  "),
            Span::styled(format_binary(snap.io.ddrb as u32, 8), value),
        ]),
        Line::from(vec![
            Span::raw("PORTB: "),
            Span::styled(format_binary(snap.io.portb as u32, 8), value),
        ]),
        Line::from(vec![
            Span::raw("PINB:  "),
            Span::styled(format_binary(snap.io.pinb as u32, 8), value),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Control Unit ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the register file, four registers per row.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = app.cu.registers().as_array();

    let content: Vec<Line> = (0..REGISTER_COUNT)
        .step_by(4)
        .map(|row| {
            let spans: Vec<Span> = (row..row + 4)
                .map(|i| {
                    let style = if regs[i] != 0 {
                        Style::default().fg(Color::White)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    Span::styled(format!("R{:<2}={:02X}  ", i, regs[i]), style)
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(paragraph, area);
}

/// Draw data memory view, eight bytes per row.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let sp = app.cu.sp();

    let items: Vec<ListItem> = (0..visible_rows)
        .map(|row| (app.mem_scroll + row) * 8)
        .map(|base| {
            let cells = app.cu.data_memory().dump(base, 8);
            let bytes: Vec<String> = cells.iter().map(|(_, b)| format!("{:02X}", b)).collect();
            let text = format!("{:04X}: {}", base, bytes.join(" "));

            let style = if (base..base + 8).contains(&sp) {
                Style::default().fg(Color::Yellow)
            } else if cells.iter().any(|(_, b)| *b != 0) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Data Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Instruction  c: Clock cycle  r: Run  p: Pause"),
        Line::from("b: Breakpoint  x: Reset  0-7: Toggle PINB bit"),
        Line::from("↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
