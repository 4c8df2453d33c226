//! Layout and drawing: menu, board, sidebar, pause, game over and quit menu.
//!
//! The game core works in virtual px; one terminal column is [`PX_PER_COL`] px wide and one
//! row [`PX_PER_ROW`] px tall, which keeps tiles roughly square on screen.

use crate::app::{MenuState, QuitOption, RoundSummary, Screen};
use crate::board::{Board, BoardGeometry};
use crate::collision::HitBox;
use crate::league::League;
use crate::session::{GameSession, INDESTRUCTIBLE_DURATION};
use crate::theme::Theme;
use crate::tile::{Character, ColorPair, RowId, Shape, TileId, TileSize};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

pub const PX_PER_COL: f32 = 10.0;
pub const PX_PER_ROW: f32 = 20.0;

const SIDEBAR_WIDTH: u16 = 24;
/// Widest lane, in columns; wider terminals get a centred board.
const MAX_LANE_COLS: u16 = 14;
/// Narrowest lane that still fits a tile face.
const MIN_LANE_COLS: u16 = 4;
const MIN_BOARD_ROWS: u16 = 12;

const EXPLOSION_FADE_MS: u32 = 350;
const GAME_OVER_FADE_MS: u32 = 900;

/// Everything a frame needs, borrowed from the app for the duration of one draw.
pub struct View<'a> {
    pub screen: Screen,
    pub theme: &'a Theme,
    pub session: &'a GameSession,
    pub board: &'a Board,
    pub character: &'a Character,
    pub character_x: f32,
    pub geometry: Option<&'a BoardGeometry>,
    pub menu: &'a MenuState,
    pub summary: Option<&'a RoundSummary>,
    pub banner: Option<&'a str>,
    pub quit_selected: QuitOption,
    pub username: &'a str,
    pub best: u32,
    pub now: Instant,
}

/// TachyonFX state: tile explosions and the game-over fade.
#[derive(Default)]
pub struct Effects {
    /// Tiles fading out right now.
    exploding: Vec<TileId>,
    /// Tiles that finished exploding; not drawn until their row resets.
    hidden: HashSet<TileId>,
    explosion: Option<Effect>,
    fade_board: bool,
    game_over: Option<Effect>,
    last_process: Option<Instant>,
}

impl Effects {
    pub fn explode(&mut self, tiles: Vec<TileId>) {
        self.hidden.extend(self.exploding.drain(..));
        self.exploding = tiles;
        self.explosion = None;
    }

    /// Removes tiles without animating them.
    pub fn hide(&mut self, tiles: Vec<TileId>) {
        self.hidden.extend(tiles);
    }

    pub fn forget_row(&mut self, row: RowId) {
        self.hidden.retain(|t| t.row != row);
        self.exploding.retain(|t| t.row != row);
    }

    pub fn fade_board(&mut self) {
        self.fade_board = true;
        self.game_over = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn is_visible(&self, id: &TileId) -> bool {
        !self.hidden.contains(id)
    }
}

/// Board inner rect (no border) for `lanes` lanes in `area`; zero-sized when it does not fit.
pub fn board_rect(area: Rect, lanes: usize) -> Rect {
    let lanes = lanes.max(1) as u16;
    let available = area.width.saturating_sub(SIDEBAR_WIDTH + 2);
    let lane_cols = (available / lanes).min(MAX_LANE_COLS);
    let height = area.height.saturating_sub(2);
    if lane_cols < MIN_LANE_COLS || height < MIN_BOARD_ROWS {
        return Rect::new(area.x, area.y, 0, 0);
    }
    let width = lane_cols * lanes;
    let total_w = width + 2 + SIDEBAR_WIDTH;
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2 + 1,
        y: area.y + 1,
        width,
        height,
    }
}

/// Virtual-px geometry of the board that fits `area`, or `None` if the terminal is too small.
pub fn board_geometry(area: Rect, lanes: usize, tile_size: TileSize) -> Option<BoardGeometry> {
    let rect = board_rect(area, lanes);
    if rect.width == 0 || rect.height == 0 {
        return None;
    }
    let lane_cols = rect.width / lanes.max(1) as u16;
    Some(BoardGeometry::new(
        lanes,
        lane_cols as f32 * PX_PER_COL,
        rect.height as f32 * PX_PER_ROW,
        tile_size,
    ))
}

/// Terminal cells covered by `hb`, clipped to `board`.
fn cells_for(board: Rect, hb: &HitBox) -> Option<Rect> {
    let left = (hb.left / PX_PER_COL).round() as i32;
    let right = (hb.right() / PX_PER_COL).round() as i32;
    let top = (hb.top / PX_PER_ROW).round() as i32;
    let bottom = (hb.bottom() / PX_PER_ROW).round() as i32;
    let l = left.clamp(0, board.width as i32);
    let r = right.clamp(0, board.width as i32);
    let t = top.clamp(0, board.height as i32);
    let b = bottom.clamp(0, board.height as i32);
    if r <= l || b <= t {
        return None;
    }
    Some(Rect {
        x: board.x + l as u16,
        y: board.y + t as u16,
        width: (r - l) as u16,
        height: (b - t) as u16,
    })
}

/// Centre cell of `hb` on screen, if it is on the board.
fn centre_cell(board: Rect, hb: &HitBox) -> Option<(u16, u16)> {
    let cx = ((hb.left + hb.width / 2.0) / PX_PER_COL).floor() as i32;
    let cy = ((hb.top + hb.height / 2.0) / PX_PER_ROW).floor() as i32;
    if cx < 0 || cy < 0 || cx >= board.width as i32 || cy >= board.height as i32 {
        return None;
    }
    Some((board.x + cx as u16, board.y + cy as u16))
}

/// Draw current screen with optional overlays and effects.
pub fn draw(frame: &mut Frame, view: &View, effects: &mut Effects) {
    let area = frame.area();
    match view.screen {
        Screen::Menu => draw_menu(frame, view, area),
        Screen::Playing => {
            let board = draw_game(frame, view, effects, area);
            apply_effects(frame, view, effects, board);
            if view.session.is_paused {
                draw_pause_overlay(frame, view.theme, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, view, effects, area);
            draw_quit_menu(frame, view.theme, view.quit_selected);
        }
        Screen::GameOver => {
            let board = draw_game(frame, view, effects, area);
            apply_effects(frame, view, effects, board);
            draw_game_over(frame, view, area);
        }
    }
}

/// Runs the explosion and game-over fades over the board.
fn apply_effects(frame: &mut Frame, view: &View, effects: &mut Effects, board: Rect) {
    let delta = effects
        .last_process
        .map(|t| view.now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    effects.last_process = Some(view.now);
    let bg = view.theme.bg;

    if !effects.exploding.is_empty() {
        if effects.explosion.is_none() {
            let cells = exploding_cells(view, &effects.exploding, board);
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
                cells.contains(&(pos.x, pos.y))
            }));
            let effect = fx::fade_to(bg, bg, (EXPLOSION_FADE_MS, Interpolation::Linear))
                .with_filter(filter)
                .with_area(board);
            effects.explosion = Some(effect);
        }
        if let Some(effect) = effects.explosion.as_mut() {
            frame.render_effect(effect, board, tfx_delta);
        }
        if effects.explosion.as_ref().is_some_and(Effect::done) {
            let done: Vec<TileId> = effects.exploding.drain(..).collect();
            effects.hidden.extend(done);
            effects.explosion = None;
        }
    }

    if effects.fade_board {
        let effect = effects.game_over.get_or_insert_with(|| {
            fx::fade_to(view.theme.inactive_fg, bg, (GAME_OVER_FADE_MS, Interpolation::Linear))
                .with_area(board)
        });
        frame.render_effect(effect, board, tfx_delta);
    }
}

fn exploding_cells(view: &View, tiles: &[TileId], board: Rect) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    let Some(geometry) = view.geometry else {
        return set;
    };
    for id in tiles {
        let Some(row) = view.board.row(id.row) else {
            continue;
        };
        let hb = geometry.tile_hit_box(row.offset, id.index);
        if let Some(r) = cells_for(board, &hb) {
            for y in r.y..r.y + r.height {
                for x in r.x..r.x + r.width {
                    set.insert((x, y));
                }
            }
        }
    }
    set
}

fn bold(style: Style) -> Style {
    style.add_modifier(Modifier::BOLD)
}

fn draw_menu(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let ranking_rows = view.menu.rankings.len().max(1) as u16;
    let popup_w = 48u16;
    let popup_h = 16 + ranking_rows;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Tile", bold(Style::default().fg(theme.shapes[2]))),
        Span::styled("rush ", bold(Style::default().fg(theme.main_fg))),
    ]);
    let highlight = bold(Style::default().fg(Color::Black).bg(theme.title));
    let normal = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);

    let leagues: Vec<Span> = League::ALL
        .iter()
        .map(|&l| {
            let style = if l == view.menu.selected_league {
                highlight
            } else {
                normal
            };
            Span::styled(format!(" {} ", l.name().to_uppercase()), style)
        })
        .collect();

    let cfg = view.menu.selected_league.config();
    let next = match cfg.next_level_points {
        Some(points) => format!("{points} pts to advance"),
        None => "top league".to_string(),
    };
    let mut lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(format!("Player: {}", view.username), normal)),
        Line::from(""),
        Line::from(leagues),
        Line::from(Span::styled(
            format!(
                "{} lanes · {} pt/match · {}",
                cfg.tiles_per_row, cfg.points_per_match, next
            ),
            dim,
        )),
        Line::from(""),
        Line::from(Span::styled("Rankings", Style::default().fg(theme.title))),
    ];
    if view.menu.rankings.is_empty() {
        lines.push(Line::from(Span::styled("no games yet", dim)));
    }
    for entry in &view.menu.rankings {
        let style = if entry.username == view.username {
            bold(normal)
        } else {
            normal
        };
        lines.push(Line::from(Span::styled(
            format!("{:>2}. {:<20} {:>6}", entry.position, entry.username, entry.score),
            style,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " ←/→ League  Enter Start  M Sound  Q Quit ",
        dim,
    )));

    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

/// Draws board and sidebar; returns the board rect.
fn draw_game(frame: &mut Frame, view: &View, effects: &Effects, area: Rect) -> Rect {
    let theme = view.theme;
    let board = board_rect(area, view.session.config().tiles_per_row);
    let Some(geometry) = view.geometry.filter(|_| board.width > 0) else {
        Paragraph::new("Terminal too small: enlarge it to play")
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.main_fg))
            .render(area, frame.buffer_mut());
        return board;
    };

    let outer = Rect {
        x: board.x - 1,
        y: board.y - 1,
        width: board.width + 2,
        height: board.height + 2,
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(" Tilerush ", Style::default().fg(theme.title)))
        .render(outer, frame.buffer_mut());

    let buf = frame.buffer_mut();
    draw_lane_dividers(buf, board, geometry, theme);
    for row in view.board.rows() {
        for (index, tile) in row.tiles.iter().enumerate() {
            if !effects.is_visible(&tile.id) {
                continue;
            }
            let hb = geometry.tile_hit_box(row.offset, index);
            paint_token(
                buf,
                board,
                &hb,
                tile.colors,
                tile.shape,
                tile.expression.face(),
                tile.power_up.badge(),
                Style::default(),
            );
        }
    }
    let size = geometry.character_width();
    let character_box = HitBox {
        left: view.character_x,
        top: geometry.character_top(),
        width: size,
        height: size,
    };
    let mut colors = view.character.colors;
    if view.session.is_indestructible() {
        colors.background = theme.title;
    }
    paint_token(
        buf,
        board,
        &character_box,
        colors,
        view.character.shape,
        view.character.expression.face(),
        "",
        bold(Style::default()),
    );

    let sidebar = Rect {
        x: outer.x + outer.width,
        y: outer.y,
        width: SIDEBAR_WIDTH.min(area.width.saturating_sub(outer.x + outer.width)),
        height: outer.height,
    };
    draw_sidebar(frame, view, sidebar);
    board
}

fn draw_lane_dividers(buf: &mut Buffer, board: Rect, geometry: &BoardGeometry, theme: &Theme) {
    let style = Style::default().fg(theme.div_line).bg(theme.bg);
    for lane in 1..geometry.lanes {
        let x = board.x + (lane as f32 * geometry.lane_width / PX_PER_COL).round() as u16;
        if x >= board.x + board.width {
            continue;
        }
        for y in board.y..board.y + board.height {
            buf[(x, y)].set_symbol("┊").set_style(style);
        }
    }
}

/// Paints a tile or the character: coloured block, shape glyph in the middle, face below
/// and an optional badge in the corner.
fn paint_token(
    buf: &mut Buffer,
    board: Rect,
    hb: &HitBox,
    colors: ColorPair,
    shape: Shape,
    face: &str,
    badge: &str,
    extra: Style,
) {
    let Some(cells) = cells_for(board, hb) else {
        return;
    };
    let fill = Style::default().bg(colors.background);
    for y in cells.y..cells.y + cells.height {
        for x in cells.x..cells.x + cells.width {
            buf[(x, y)].set_symbol(" ").set_style(fill);
        }
    }
    let ink = Style::default().fg(colors.shape).bg(colors.background).patch(extra);
    if let Some((cx, cy)) = centre_cell(board, hb) {
        buf[(cx, cy)].set_symbol(shape.glyph()).set_style(ink);
        let face_w = face.chars().count() as u16;
        let face_y = cy + 1;
        if cells.width >= face_w + 2 && face_y < cells.y + cells.height {
            let face_x = cx.saturating_sub(face_w / 2).max(cells.x);
            buf.set_string(face_x, face_y, face, ink);
        }
    }
    if !badge.is_empty() && cells.width > 3 {
        let style = bold(Style::default().fg(Color::Black).bg(colors.shape));
        buf.set_string(cells.x, cells.y, badge, style);
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    if area.width < 4 {
        return;
    }
    let theme = view.theme;
    let session = view.session;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // stats
            Constraint::Length(1),
            Constraint::Length(4), // character
            Constraint::Length(1),
            Constraint::Length(4), // league progress
            Constraint::Length(1),
            Constraint::Length(4), // power / banner
        ])
        .split(area);

    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let best = view.best.max(session.score);
    Paragraph::new(Text::from(vec![
        stat("Score: ", session.score.to_string()),
        stat("Best:  ", best.to_string()),
        stat("Time:  ", session.time.to_string()),
        stat("Speed: ", format!("{:.1}", session.game_speed)),
        stat("League: ", session.league().to_string()),
        stat("Player: ", view.username.to_string()),
    ]))
    .render(stats_inner, frame.buffer_mut());

    let you_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("You", title_style));
    let you_inner = you_block.inner(chunks[2]);
    you_block.render(chunks[2], frame.buffer_mut());
    let c = view.character;
    let swatch = Style::default().fg(c.colors.shape).bg(c.colors.background);
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(format!(" {} ", c.shape.glyph()), bold(swatch)),
            Span::styled(format!(" {}", c.expression.face()), fg_style),
        ]),
        Line::from(Span::styled("match shape or colour", Style::default().fg(theme.inactive_fg))),
    ])
    .render(you_inner, frame.buffer_mut());

    let progress_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Next league", title_style));
    let progress_inner = progress_block.inner(chunks[4]);
    progress_block.render(chunks[4], frame.buffer_mut());
    match session.config().next_level_points {
        Some(target) if target > 0 => {
            let ratio = (session.score as f64 / target as f64).min(1.0);
            Gauge::default()
                .ratio(ratio)
                .label(format!("{}/{}", session.score, target))
                .gauge_style(Style::default().fg(theme.shapes[0]))
                .render(progress_inner, frame.buffer_mut());
        }
        _ => Paragraph::new(Span::styled("top league", fg_style)).render(progress_inner, frame.buffer_mut()),
    }

    let power_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let power_inner = power_block.inner(chunks[6]);
    power_block.render(chunks[6], frame.buffer_mut());
    if session.is_indestructible() {
        let ratio = session.indestructible_remaining().as_secs_f64()
            / INDESTRUCTIBLE_DURATION.as_secs_f64();
        Gauge::default()
            .ratio(ratio.clamp(0.0, 1.0))
            .label("indestructible")
            .gauge_style(Style::default().fg(theme.title))
            .render(power_inner, frame.buffer_mut());
    } else if let Some(text) = view.banner {
        Paragraph::new(Span::styled(text.to_string(), bold(title_style)))
            .alignment(Alignment::Center)
            .render(power_inner, frame.buffer_mut());
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let popup_w = 36u16;
    let popup_h = 13u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
    ];
    if let Some(summary) = view.summary {
        lines.push(Line::from(Span::styled(format!(" Score: {} ", summary.score), fg)));
        lines.push(Line::from(Span::styled(format!(" Time: {} ", summary.time), fg)));
        lines.push(Line::from(Span::styled(format!(" League: {} ", summary.league), fg)));
        if let Some(rank) = summary.rank {
            lines.push(Line::from(Span::styled(format!(" Rank #{rank} "), fg)));
        }
        if let Some(next) = summary.promoted_to {
            lines.push(Line::from(Span::styled(
                format!(" Promoted to {next}! "),
                bold(Style::default().fg(Color::Yellow)),
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart  Enter — Menu  Q — Quit ",
        fg,
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Tilerush ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24.min(area.width);
    let qh = 8.min(area.height);
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .style(Style::default().bg(theme.bg))
        .title(" Quit? ");
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let ry = inner.y + 1 + i as u16 * 2;
        if ry >= inner.y + inner.height {
            break;
        }
        let style = if *opt == selected {
            bold(Style::default().fg(theme.bg).bg(theme.title))
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
