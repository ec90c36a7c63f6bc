use crate::game::{ClientGame, Session};
use crate::reconciliation::ReconcileOutcome;
use macroquad::prelude::*;
use shared::math::yaw;
use shared::{AuthorityMode, CorrectionPhase, Vec3 as WorldVec3};

/// Pixels per world unit in the top-down view
const SCALE: f32 = 14.0;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub connected: bool,
    pub tick: u32,
    pub phase: CorrectionPhase,
    pub authority: AuthorityMode,
    pub health: f32,
    pub snaps: u32,
    pub last_outcome: ReconcileOutcome,
    pub latency_ms: u64,
    pub fake_ping_ms: u64,
    pub player_count: usize,
}

pub struct Renderer {
    width: f32,
    height: f32,
    pub show_debug: bool,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
            show_debug: true,
        }
    }

    fn to_screen(&self, position: WorldVec3) -> (f32, f32) {
        (
            self.width * 0.5 + position.x * SCALE,
            self.height * 0.5 - position.z * SCALE,
        )
    }

    pub fn render(&mut self, game: &ClientGame, fake_ping_ms: u64) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        self.draw_obstacles(game);

        for view in game.remote_entities() {
            let color = if view.is_dead {
                Color::from_rgba(85, 85, 85, 255)
            } else if Some(view.team) == game.session().map(|session| session.team) {
                Color::from_rgba(0, 170, 255, 255)
            } else {
                Color::from_rgba(255, 68, 68, 255)
            };
            self.draw_player(view.position, yaw(view.rotation), color);
            self.draw_health_bar(view.position, view.health);
        }

        if let Some(session) = game.session() {
            if self.show_debug {
                self.draw_debug_poses(session);
            }
            let live = session.live();
            self.draw_player(live.position, yaw(live.rotation), GREEN);
            self.draw_health_bar(live.position, session.health());
        }

        for effect in game.effects() {
            let (x, y) = self.to_screen(effect.point);
            draw_circle_lines(x, y, 4.0, 1.0, YELLOW);
        }

        let ui = match game.session() {
            Some(session) => UiConfig {
                connected: true,
                tick: session.tick(),
                phase: session.correction().phase(),
                authority: session.correction().authority(),
                health: session.health(),
                snaps: session.snaps(),
                last_outcome: session.last_outcome(),
                latency_ms: session
                    .last_snapshot()
                    .map_or(0, |(_, latency)| (latency * 1000.0) as u64),
                fake_ping_ms,
                player_count: game.remote_entities().count() + 1,
            },
            None => UiConfig {
                connected: false,
                tick: 0,
                phase: CorrectionPhase::Idle,
                authority: AuthorityMode::ClientOwned,
                health: 0.0,
                snaps: 0,
                last_outcome: ReconcileOutcome::Skipped,
                latency_ms: 0,
                fake_ping_ms,
                player_count: 0,
            },
        };
        self.draw_ui(ui);
    }

    fn draw_obstacles(&self, game: &ClientGame) {
        for obstacle in &game.world().obstacles {
            let (x0, y0) = self.to_screen(obstacle.min);
            let (x1, y1) = self.to_screen(obstacle.max);
            draw_rectangle(
                x0.min(x1),
                y0.min(y1),
                (x1 - x0).abs(),
                (y1 - y0).abs(),
                Color::from_rgba(68, 68, 68, 255),
            );
        }
    }

    fn draw_player(&self, position: WorldVec3, yaw: f32, color: Color) {
        let (x, y) = self.to_screen(position);
        let radius = 0.5 * SCALE;
        draw_circle(x, y, radius, color);
        draw_circle_lines(x, y, radius, 2.0, WHITE);

        let (dx, dy) = (yaw.sin(), -yaw.cos());
        draw_line(x, y, x + dx * radius * 1.6, y + dy * radius * 1.6, 2.0, WHITE);
    }

    fn draw_health_bar(&self, position: WorldVec3, health: f32) {
        let (x, y) = self.to_screen(position);
        let width = 1.2 * SCALE;
        let filled = width * (health / 100.0).clamp(0.0, 1.0);
        let top = y - 0.5 * SCALE - 8.0;
        draw_rectangle(x - width * 0.5, top, width, 3.0, Color::from_rgba(51, 51, 51, 255));
        draw_rectangle(x - width * 0.5, top, filled, 3.0, GREEN);
    }

    /// Last authoritative pose, predicted pose at that tick and the
    /// extrapolated pose, as outlines around the live player.
    fn draw_debug_poses(&self, session: &Session) {
        let radius = 0.5 * SCALE;
        if let Some((snapshot, _)) = session.last_snapshot() {
            let (x, y) = self.to_screen(snapshot.position);
            draw_rectangle_lines(x - radius, y - radius, radius * 2.0, radius * 2.0, 1.0, RED);

            let predicted = session.prediction().predicted(snapshot.tick);
            let (x, y) = self.to_screen(predicted.position);
            draw_rectangle_lines(x - radius, y - radius, radius * 2.0, radius * 2.0, 1.0, BLUE);
        }
        if let Some(held) = session.extrapolation().held() {
            let (x, y) = self.to_screen(held.position);
            draw_rectangle_lines(x - radius, y - radius, radius * 2.0, radius * 2.0, 1.0, MAGENTA);
        }
    }

    fn draw_ui(&mut self, config: UiConfig) {
        let y_start = 10.0;
        let indicator_size = 12.0;
        let spacing = 25.0;

        let flags = [
            ("C", config.connected),
            ("R", config.phase == CorrectionPhase::Reconciling),
            ("X", config.phase == CorrectionPhase::Extrapolating),
            ("S", config.authority == AuthorityMode::ServerOwned),
        ];

        for (i, (label, enabled)) in flags.iter().enumerate() {
            let x = 10.0 + (i as f32) * spacing;
            let color = if *enabled { GREEN } else { Color::from_rgba(51, 51, 51, 255) };

            draw_rectangle(x, y_start, indicator_size, indicator_size, color);
            draw_rectangle_lines(x, y_start, indicator_size, indicator_size, 1.0, WHITE);

            draw_text(label, x + 3.0, y_start + indicator_size + 12.0, 12.0, WHITE);
        }

        let ping_y = y_start + 40.0;
        let total_ping = config.latency_ms + config.fake_ping_ms;
        let ping_bars = ((total_ping / 20).min(10)) as i32;

        for i in 0..10i32 {
            let bar_color = if i < ping_bars {
                if total_ping < 50 {
                    GREEN
                } else if total_ping < 100 {
                    YELLOW
                } else {
                    RED
                }
            } else {
                Color::from_rgba(51, 51, 51, 255)
            };

            draw_rectangle(10.0 + (i as f32) * 3.0, ping_y, 2.0, 8.0, bar_color);
        }
        draw_text(&format!("{}ms", total_ping), 45.0, ping_y + 8.0, 12.0, WHITE);

        let lines = [
            format!("tick {}", config.tick),
            format!("hp {:.0}", config.health),
            format!("{} players", config.player_count),
            format!("snaps {}", config.snaps),
            match config.last_outcome {
                ReconcileOutcome::Skipped => "last: -".to_string(),
                ReconcileOutcome::Accepted { divergence } => format!("last: ok {:.2}", divergence),
                ReconcileOutcome::Snapped { divergence, replayed } => {
                    format!("last: snap {:.2} +{}", divergence, replayed)
                }
            },
        ];
        for (i, line) in lines.iter().enumerate() {
            draw_text(line, 10.0, ping_y + 24.0 + i as f32 * 14.0, 14.0, WHITE);
        }
    }
}
