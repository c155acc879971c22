use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::OrbitCamera;
use crate::config::CityConfig;
use crate::picking::pick_ndc;
use crate::scene::{AnimationState, BuildingId, City};

/// Score and hover state of one play session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub score: u32,
    pub hovered: Option<BuildingId>,
    pub started: bool,
}

/// What the score panel shows for the building under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoverInfo {
    pub building: BuildingId,
    pub point_value: u32,
    pub position: Vec3,
}

/// Result of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Missed,
    /// The nearest building under the pointer is cooling down or was never
    /// interactive.
    Ignored(BuildingId),
    Scored { building: BuildingId, points: u32 },
}

/// Interaction controller: owns the building table and reacts to hover and
/// click events. Visual restoration after the cooldown is driven by
/// [`crate::animation::AnimationDriver`].
#[derive(Debug, Clone)]
pub struct Session {
    config: CityConfig,
    city: City,
    state: SessionState,
}

impl Session {
    pub fn new(config: CityConfig, city: City) -> Self {
        Self {
            config,
            city,
            state: SessionState {
                started: true,
                ..SessionState::default()
            },
        }
    }

    pub fn config(&self) -> &CityConfig {
        &self.config
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn city_mut(&mut self) -> &mut City {
        &mut self.city
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn hovered(&self) -> Option<HoverInfo> {
        let id = self.state.hovered?;
        let building = self.city.get(id)?;
        Some(HoverInfo {
            building: id,
            point_value: building.point_value,
            position: building.position,
        })
    }

    /// Hit-tests the pointer and updates the hover highlight.
    pub fn pointer_moved(&mut self, camera: &OrbitCamera, ndc: Vec2) -> Option<HoverInfo> {
        let hit = pick_ndc(&self.city.buildings, camera, ndc).map(|hit| hit.building);
        self.hover(hit)
    }

    /// Hit-tests the pointer and applies a click at wall-clock `now` seconds.
    pub fn clicked(&mut self, camera: &OrbitCamera, ndc: Vec2, now: f64) -> ClickOutcome {
        let hit = pick_ndc(&self.city.buildings, camera, ndc).map(|hit| hit.building);
        self.click(hit, now)
    }

    /// Applies the hover highlight for the nearest hit building, if any.
    pub fn hover(&mut self, hit: Option<BuildingId>) -> Option<HoverInfo> {
        let base = self.config.base_intensity;
        for building in self.city.buildings.iter_mut().filter(|b| b.is_interactive) {
            building.emissive_intensity = base;
        }

        let hovered = hit.filter(|id| self.city.get(*id).is_some_and(|b| b.is_interactive));
        if let Some(id) = hovered {
            let intensity = self.config.hover_intensity;
            self.city.update(id, |b| b.emissive_intensity = intensity);
        }
        if hovered != self.state.hovered {
            log::trace!("hover changed: {:?} -> {:?}", self.state.hovered, hovered);
        }
        self.state.hovered = hovered;
        self.hovered()
    }

    /// Awards points for an interactive building and starts its growth tween.
    pub fn click(&mut self, hit: Option<BuildingId>, now: f64) -> ClickOutcome {
        let Some(id) = hit else {
            return ClickOutcome::Missed;
        };
        let cooldown = self.config.cooldown;
        let intensity = self.config.click_intensity;
        let points = self.city.update(id, |building| {
            if !building.is_interactive {
                return None;
            }
            building.is_interactive = false;
            building.emissive = Vec3::ONE;
            building.emissive_intensity = intensity;
            building.animation = AnimationState::Growing { progress: 0.0 };
            building.cooldown_until = Some(now + cooldown);
            Some(building.point_value)
        });

        match points {
            None => ClickOutcome::Missed,
            Some(Some(points)) => {
                self.state.score = self.state.score.saturating_add(points);
                if self.state.hovered == Some(id) {
                    self.state.hovered = None;
                }
                log::info!(
                    "building {} scored {points} points, total {}",
                    id.0,
                    self.state.score
                );
                ClickOutcome::Scored {
                    building: id,
                    points,
                }
            }
            Some(None) => ClickOutcome::Ignored(id),
        }
    }

    /// Restores every building whose cooldown has elapsed by `now`.
    /// Returns how many were restored.
    pub fn expire_cooldowns(&mut self, now: f64) -> usize {
        let base = self.config.base_intensity;
        let mut restored = 0;
        for building in &mut self.city.buildings {
            if !building.cooldown_until.is_some_and(|until| until <= now) {
                continue;
            }
            building.cooldown_until = None;
            building.animation = AnimationState::Idle;
            building.emissive = building.base_color;
            building.emissive_intensity = base;
            building.scale_y = 1.0;
            building.position.y = building.rest_y();
            building.is_interactive = true;
            restored += 1;
        }
        if restored > 0 {
            log::debug!("{restored} building(s) back online");
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Building, Environment, GridOverlay, GroundPlane};

    fn session(buildings: Vec<(bool, u32)>) -> Session {
        let buildings = buildings
            .into_iter()
            .enumerate()
            .map(|(index, (interactive, points))| {
                Building::new(
                    BuildingId(index as u32),
                    (index as f32 * 15.0, 0.0),
                    Vec3::new(6.0, 20.0, 6.0),
                    Vec3::new(0.0, 1.0, 1.0),
                    interactive,
                    points,
                    0.2,
                )
            })
            .collect();
        let city = City {
            buildings,
            environment: Environment {
                background: Vec3::ZERO,
                ground: GroundPlane {
                    size: 100.0,
                    color: Vec3::ZERO,
                },
                grid: GridOverlay {
                    size: 100.0,
                    divisions: 10,
                    color: Vec3::ONE,
                    opacity: 0.2,
                    elevation: 0.1,
                },
                stars: Vec::new(),
            },
        };
        Session::new(CityConfig::default(), city)
    }

    #[test]
    fn new_session_starts_at_zero() {
        let session = session(vec![(true, 3)]);
        assert_eq!(session.score(), 0);
        assert!(session.state().started);
        assert!(session.hovered().is_none());
    }

    #[test]
    fn three_clicks_add_up() {
        let mut session = session(vec![(true, 3), (true, 5), (true, 2)]);
        for id in 0..3 {
            session.click(Some(BuildingId(id)), 1.0);
        }
        assert_eq!(session.score(), 10);
    }

    #[test]
    fn click_scores_once_and_disables() {
        let mut session = session(vec![(true, 7)]);
        let outcome = session.click(Some(BuildingId(0)), 10.0);
        assert_eq!(
            outcome,
            ClickOutcome::Scored {
                building: BuildingId(0),
                points: 7
            }
        );
        let building = session.city().get(BuildingId(0)).unwrap();
        assert!(!building.is_interactive);
        assert_eq!(building.emissive, Vec3::ONE);
        assert_eq!(building.emissive_intensity, 1.0);
        assert_eq!(building.cooldown_until, Some(13.0));
        assert_eq!(building.animation, AnimationState::Growing { progress: 0.0 });

        assert_eq!(
            session.click(Some(BuildingId(0)), 11.0),
            ClickOutcome::Ignored(BuildingId(0))
        );
        assert_eq!(session.score(), 7);
    }

    #[test]
    fn disabled_and_missed_clicks_keep_score() {
        let mut session = session(vec![(false, 9)]);
        assert_eq!(
            session.click(Some(BuildingId(0)), 0.0),
            ClickOutcome::Ignored(BuildingId(0))
        );
        assert_eq!(session.click(None, 0.0), ClickOutcome::Missed);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn unknown_building_is_a_miss() {
        let mut session = session(vec![(true, 9)]);
        assert_eq!(session.click(Some(BuildingId(42)), 0.0), ClickOutcome::Missed);
        assert_eq!(session.score(), 0);
        assert!(session.city().get(BuildingId(0)).unwrap().is_interactive);
    }

    #[test]
    fn score_saturates_instead_of_overflowing() {
        let mut session = session(vec![(true, 5), (true, 5)]);
        session.state.score = u32::MAX - 1;
        session.click(Some(BuildingId(0)), 0.0);
        session.click(Some(BuildingId(1)), 0.0);
        assert_eq!(session.score(), u32::MAX);
    }

    #[test]
    fn cooldown_restores_building() {
        let mut session = session(vec![(true, 4)]);
        session.click(Some(BuildingId(0)), 0.0);
        session.city_mut().update(BuildingId(0), |b| {
            b.scale_y = 1.5;
            b.position.y = 15.0;
        });

        assert_eq!(session.expire_cooldowns(2.9), 0);
        assert!(!session.city().get(BuildingId(0)).unwrap().is_interactive);

        assert_eq!(session.expire_cooldowns(3.0), 1);
        let building = session.city().get(BuildingId(0)).unwrap();
        assert!(building.is_interactive);
        assert_eq!(building.scale_y, 1.0);
        assert_eq!(building.position.y, 10.0);
        assert_eq!(building.emissive, building.base_color);
        assert_eq!(building.emissive_intensity, 0.2);
        assert_eq!(building.animation, AnimationState::Idle);

        assert_eq!(
            session.click(Some(BuildingId(0)), 3.5),
            ClickOutcome::Scored {
                building: BuildingId(0),
                points: 4
            }
        );
        assert_eq!(session.score(), 8);
    }

    #[test]
    fn hover_highlights_only_interactive() {
        let mut session = session(vec![(true, 6), (false, 2)]);
        let info = session.hover(Some(BuildingId(0))).unwrap();
        assert_eq!(info.point_value, 6);
        assert_eq!(info.position, Vec3::new(0.0, 10.0, 0.0));
        let intensity = |session: &Session, id| {
            session.city().get(BuildingId(id)).unwrap().emissive_intensity
        };
        assert_eq!(intensity(&session, 0), 0.5);

        assert!(session.hover(Some(BuildingId(1))).is_none());
        assert_eq!(session.state().hovered, None);
        assert_eq!(intensity(&session, 0), 0.2);
        assert_eq!(intensity(&session, 1), 0.2);
    }

    #[test]
    fn clicking_hovered_building_clears_hover() {
        let mut session = session(vec![(true, 6)]);
        session.hover(Some(BuildingId(0)));
        session.click(Some(BuildingId(0)), 0.0);
        assert!(session.hovered().is_none());
    }

    #[test]
    fn pointer_over_empty_space_clears_hover() {
        let mut session = session(vec![(true, 6)]);
        let camera = OrbitCamera::new(&CityConfig::default(), 1.0);
        assert!(session.pointer_moved(&camera, Vec2::ZERO).is_some());
        assert!(session.pointer_moved(&camera, Vec2::new(0.0, 0.95)).is_none());
        assert!(session.state().hovered.is_none());
    }

    #[test]
    fn clicking_through_the_camera() {
        let mut session = session(vec![(true, 6)]);
        let camera = OrbitCamera::new(&CityConfig::default(), 1.0);
        let outcome = session.clicked(&camera, Vec2::ZERO, 0.0);
        assert_eq!(
            outcome,
            ClickOutcome::Scored {
                building: BuildingId(0),
                points: 6
            }
        );
        assert_eq!(session.clicked(&camera, Vec2::ZERO, 0.1), ClickOutcome::Ignored(BuildingId(0)));
    }
}
