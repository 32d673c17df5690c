//! # World View
//!
//! The client's picture of the arena: the latest snapshot, the derived
//! camera, and the queries a renderer needs once per frame.
//!
//! ## Update Model
//!
//! ```text
//! UPDATE frame ──decode──▶ WorldSnapshot ──replace──▶ WorldView
//!                                                        │
//!                          render frame ──advance_camera─┤
//!                                                        ▼
//!                                              Camera { center, zoom }
//! ```
//!
//! Snapshots are never merged or interpolated: the newest one wins.

use std::sync::Arc;

use slither_shared::Vec2;

use crate::config::{CameraConfig, Viewport};
use crate::protocol::{FoodState, SnakeState, WorldSnapshot};

/// Zoom the camera eases toward for a given score.
///
/// `1 / sqrt(ln(score + 10) / 2.5)`. Negative scores count as zero.
#[must_use]
pub fn target_zoom(score: f32) -> f64 {
    let score = f64::from(score.max(0.0));
    1.0 / ((score + 10.0).ln() / 2.5).sqrt()
}

/// Where the renderer should look.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// World point drawn at the middle of the canvas.
    pub center: Vec2,
    /// Pixels per world unit.
    pub zoom: f64,
}

impl Camera {
    /// World point drawn at the canvas's top-left corner.
    #[must_use]
    pub fn origin(&self, viewport: Viewport) -> Vec2 {
        Vec2::new(
            self.center.x - viewport.half_width() / self.zoom,
            self.center.y - viewport.half_height() / self.zoom,
        )
    }

    /// Converts a world point to canvas pixels.
    #[must_use]
    pub fn world_to_screen(&self, point: Vec2, viewport: Viewport) -> Vec2 {
        (point - self.origin(viewport)) * self.zoom
    }

    /// Whether a world point falls on the canvas.
    #[must_use]
    pub fn contains(&self, point: Vec2, viewport: Viewport) -> bool {
        let origin = self.origin(viewport);
        let width = viewport.width / self.zoom;
        let height = viewport.height / self.zoom;
        point.x >= origin.x
            && point.x <= origin.x + width
            && point.y >= origin.y
            && point.y <= origin.y + height
    }
}

/// Latest snapshot plus everything derived from it.
pub struct WorldView {
    snapshot: Arc<WorldSnapshot>,
    local_id: Option<u32>,
    camera_config: CameraConfig,
    zoom: f64,
    camera: Option<Camera>,
    /// The local snake appeared alive at least once since INIT.
    seen_local: bool,
    defeated: bool,
}

impl WorldView {
    /// Creates an empty view.
    #[must_use]
    pub fn new(camera_config: CameraConfig) -> Self {
        Self {
            snapshot: Arc::new(WorldSnapshot::empty()),
            local_id: None,
            zoom: camera_config.initial_zoom,
            camera_config,
            camera: None,
            seen_local: false,
            defeated: false,
        }
    }

    /// Adopts the id assigned by INIT and re-arms defeat detection.
    pub fn set_local_id(&mut self, id: u32) {
        self.local_id = Some(id);
        self.seen_local = false;
        self.defeated = false;
    }

    /// Id of the locally controlled snake, once INIT has arrived.
    #[inline]
    #[must_use]
    pub const fn local_id(&self) -> Option<u32> {
        self.local_id
    }

    /// Replaces the held snapshot.
    ///
    /// Returns true exactly when this snapshot moves the local snake into the
    /// defeated state: present with score <= 0, or gone after having been seen.
    pub fn apply_snapshot(&mut self, snapshot: WorldSnapshot) -> bool {
        self.snapshot = Arc::new(snapshot);

        let Some(id) = self.local_id else {
            return false;
        };
        match self.snapshot.snake(id) {
            Some(snake) if !snake.is_defeated() => {
                self.seen_local = true;
                self.defeated = false;
                false
            }
            Some(_) => self.enter_defeated(),
            None if self.seen_local => self.enter_defeated(),
            None => false,
        }
    }

    fn enter_defeated(&mut self) -> bool {
        if self.defeated {
            return false;
        }
        self.defeated = true;
        tracing::debug!("Local snake {:?} defeated", self.local_id);
        true
    }

    /// Returns true while the local snake is considered defeated.
    #[inline]
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// The held snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    /// Shared handle to the held snapshot. Clone it to keep a frame alive
    /// past the next update.
    #[inline]
    #[must_use]
    pub const fn snapshot_handle(&self) -> &Arc<WorldSnapshot> {
        &self.snapshot
    }

    /// The locally controlled snake, if present.
    #[must_use]
    pub fn local_snake(&self) -> Option<&SnakeState> {
        self.snapshot.snake(self.local_id?)
    }

    /// Local score for the HUD.
    #[must_use]
    pub fn local_score(&self) -> Option<f32> {
        self.local_snake().map(|snake| snake.score)
    }

    /// Current zoom, including smoothing applied so far.
    #[inline]
    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Camera from the last [`WorldView::advance_camera`], if any.
    #[inline]
    #[must_use]
    pub const fn camera(&self) -> Option<Camera> {
        self.camera
    }

    /// Advances the camera by one rendered frame.
    ///
    /// Follows the local snake, easing zoom toward [`target_zoom`] and never
    /// below the configured floor. Without a local snake it spectates the
    /// first listed snake at the current zoom. With no snakes at all the
    /// camera is undefined and `None` is returned; [`WorldView::camera`]
    /// keeps the last defined one.
    pub fn advance_camera(&mut self) -> Option<Camera> {
        let local = self
            .local_snake()
            .map(|snake| (snake.position, target_zoom(snake.score)));
        let center = if let Some((center, target)) = local {
            self.zoom += (target - self.zoom) * self.camera_config.smoothing;
            if self.zoom < self.camera_config.min_zoom {
                self.zoom = self.camera_config.min_zoom;
            }
            center
        } else {
            self.snapshot.snakes.first()?.position
        };

        let camera = Camera {
            center,
            zoom: self.zoom,
        };
        self.camera = Some(camera);
        Some(camera)
    }

    /// Top `count` snakes by score, highest first. Ties keep transmission order.
    #[must_use]
    pub fn leaderboard(&self, count: usize) -> Vec<&SnakeState> {
        let mut ranked: Vec<&SnakeState> = self.snapshot.snakes.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(count);
        ranked
    }

    /// Foods that fall on the canvas for `camera`.
    pub fn visible_foods(
        &self,
        camera: Camera,
        viewport: Viewport,
    ) -> impl Iterator<Item = &FoodState> + '_ {
        self.snapshot
            .foods
            .iter()
            .filter(move |food| camera.contains(food.position, viewport))
    }
}

impl Default for WorldView {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Color;

    fn snake(id: u32, x: f64, score: f32) -> SnakeState {
        SnakeState {
            id,
            position: Vec2::new(x, 0.0),
            heading: 0.0,
            score,
            color: Color::default(),
            name: format!("snake-{id}"),
            trail: Vec::new(),
        }
    }

    fn world(snakes: Vec<SnakeState>) -> WorldSnapshot {
        WorldSnapshot {
            snakes,
            foods: Vec::new(),
        }
    }

    #[test]
    fn test_target_zoom() {
        // ln(e^2.5) / 2.5 = 1
        let score = (2.5f64.exp() - 10.0) as f32;
        assert!((target_zoom(score) - 1.0).abs() < 1e-6);
        assert!(target_zoom(1000.0) < target_zoom(10.0));
        assert_eq!(target_zoom(-50.0), target_zoom(0.0));
    }

    #[test]
    fn test_zoom_eases_toward_target() {
        let mut view = WorldView::default();
        view.set_local_id(1);
        view.apply_snapshot(world(vec![snake(1, 0.0, 100.0)]));

        let target = target_zoom(100.0);
        let camera = view.advance_camera().unwrap();
        assert!((camera.zoom - (1.0 + (target - 1.0) * 0.05)).abs() < 1e-12);

        for _ in 0..1000 {
            view.advance_camera();
        }
        assert!((view.zoom() - target).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_floor_is_exact() {
        let mut view = WorldView::default();
        view.set_local_id(1);
        view.apply_snapshot(world(vec![snake(1, 0.0, 1e30)]));
        assert!(target_zoom(1e30) < 0.3);

        for _ in 0..500 {
            view.advance_camera();
        }
        assert_eq!(view.zoom(), 0.3);
        assert_eq!(view.camera().unwrap().zoom, 0.3);
    }

    #[test]
    fn test_spectates_first_snake_without_local() {
        let mut view = WorldView::default();
        view.set_local_id(99);
        view.apply_snapshot(world(vec![snake(4, 10.0, 5.0), snake(5, 20.0, 50.0)]));

        let camera = view.advance_camera().unwrap();
        assert_eq!(camera.center, Vec2::new(10.0, 0.0));
        assert_eq!(camera.zoom, 1.0);
    }

    #[test]
    fn test_empty_snapshot_has_no_camera() {
        let mut view = WorldView::default();
        view.apply_snapshot(world(vec![snake(4, 10.0, 5.0)]));
        let last = view.advance_camera();

        view.apply_snapshot(WorldSnapshot::empty());
        assert_eq!(view.advance_camera(), None);
        assert_eq!(view.camera(), last);
    }

    #[test]
    fn test_camera_origin_and_culling() {
        let camera = Camera {
            center: Vec2::new(1000.0, 1000.0),
            zoom: 2.0,
        };
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(camera.origin(viewport), Vec2::new(800.0, 850.0));
        assert_eq!(
            camera.world_to_screen(Vec2::new(1000.0, 1000.0), viewport),
            Vec2::new(400.0, 300.0)
        );
        assert!(camera.contains(Vec2::new(1199.0, 1149.0), viewport));
        assert!(!camera.contains(Vec2::new(1201.0, 1000.0), viewport));

        let mut view = WorldView::default();
        let food = |x: f64| FoodState {
            position: Vec2::new(x, 1000.0),
            value: 1.0,
            kind: 0,
        };
        view.apply_snapshot(WorldSnapshot {
            snakes: Vec::new(),
            foods: vec![food(700.0), food(1000.0), food(1300.0)],
        });
        let visible: Vec<_> = view.visible_foods(camera, viewport).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].position.x, 1000.0);
    }

    #[test]
    fn test_defeat_by_score_is_edge_triggered() {
        let mut view = WorldView::default();
        view.set_local_id(1);

        assert!(!view.apply_snapshot(world(vec![snake(1, 0.0, 10.0)])));
        assert!(view.apply_snapshot(world(vec![snake(1, 0.0, 0.0)])));
        assert!(!view.apply_snapshot(world(vec![snake(1, 0.0, -3.0)])));
        assert!(view.is_defeated());

        // Alive again re-arms the edge.
        assert!(!view.apply_snapshot(world(vec![snake(1, 0.0, 5.0)])));
        assert!(!view.is_defeated());
        assert!(view.apply_snapshot(world(vec![snake(1, 0.0, 0.0)])));
    }

    #[test]
    fn test_defeat_by_absence_requires_prior_sighting() {
        let mut view = WorldView::default();
        view.set_local_id(1);

        assert!(!view.apply_snapshot(world(vec![snake(2, 0.0, 10.0)])));
        assert!(!view.apply_snapshot(world(vec![snake(1, 0.0, 10.0)])));
        assert!(view.apply_snapshot(world(vec![snake(2, 0.0, 10.0)])));
        assert!(!view.apply_snapshot(world(vec![snake(2, 0.0, 10.0)])));

        view.set_local_id(7);
        assert!(!view.is_defeated());
    }

    #[test]
    fn test_leaderboard() {
        let mut view = WorldView::default();
        view.apply_snapshot(world(vec![
            snake(1, 0.0, 5.0),
            snake(2, 0.0, 50.0),
            snake(3, 0.0, 5.0),
            snake(4, 0.0, 20.0),
        ]));

        let ids: Vec<u32> = view.leaderboard(3).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
        assert_eq!(view.leaderboard(10).len(), 4);
    }

    #[test]
    fn test_snapshot_replaced_wholesale() {
        let mut view = WorldView::default();
        view.apply_snapshot(world(vec![snake(1, 0.0, 5.0), snake(2, 0.0, 6.0)]));
        let held = Arc::clone(view.snapshot_handle());

        view.apply_snapshot(world(vec![snake(3, 0.0, 1.0)]));
        assert_eq!(view.snapshot().snakes.len(), 1);
        assert_eq!(view.snapshot().snakes[0].id, 3);
        assert_eq!(held.snakes.len(), 2);
    }
}
