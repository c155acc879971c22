use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{hex_color, CityConfig};

/// Stable index of a building inside [`City::buildings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

impl BuildingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tween state of a building after it has been clicked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnimationState {
    Idle,
    /// Scaling toward the grown height; `progress` runs 0..=1.
    Growing { progress: f32 },
    /// Fully grown and waiting for the cooldown to restore it.
    Resetting,
}

/// One box of the city lattice together with its interaction state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    /// Centre of the box. At rest `position.y == size.y / 2`.
    pub position: Vec3,
    pub size: Vec3,
    pub base_color: Vec3,
    pub is_interactive: bool,
    pub point_value: u32,
    pub original_height: f32,
    pub animation: AnimationState,
    pub scale_y: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    /// Wall-clock second at which a clicked building is restored.
    pub cooldown_until: Option<f64>,
}

impl Building {
    pub fn new(
        id: BuildingId,
        lattice: (f32, f32),
        size: Vec3,
        base_color: Vec3,
        is_interactive: bool,
        point_value: u32,
        base_intensity: f32,
    ) -> Self {
        Self {
            id,
            position: Vec3::new(lattice.0, size.y / 2.0, lattice.1),
            size,
            base_color,
            is_interactive,
            point_value,
            original_height: size.y,
            animation: AnimationState::Idle,
            scale_y: 1.0,
            emissive: base_color,
            emissive_intensity: base_intensity,
            cooldown_until: None,
        }
    }

    /// Resting centre height, i.e. the position before any growth.
    pub fn rest_y(&self) -> f32 {
        self.original_height / 2.0
    }

    /// Current axis-aligned bounds, growth included.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let half = Vec3::new(self.size.x, self.size.y * self.scale_y, self.size.z) / 2.0;
        (self.position - half, self.position + half)
    }

    /// Scale applied to the unit cube when drawing.
    pub fn draw_scale(&self) -> Vec3 {
        Vec3::new(self.size.x, self.size.y * self.scale_y, self.size.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundPlane {
    pub size: f32,
    pub color: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridOverlay {
    pub size: f32,
    pub divisions: u32,
    pub color: Vec3,
    pub opacity: f32,
    pub elevation: f32,
}

impl GridOverlay {
    /// Line segments of the overlay, two endpoints per line.
    pub fn segments(&self) -> Vec<(Vec3, Vec3)> {
        let half = self.size / 2.0;
        let step = self.size / self.divisions.max(1) as f32;
        (0..=self.divisions)
            .flat_map(|i| {
                let offset = -half + i as f32 * step;
                [
                    (
                        Vec3::new(-half, self.elevation, offset),
                        Vec3::new(half, self.elevation, offset),
                    ),
                    (
                        Vec3::new(offset, self.elevation, -half),
                        Vec3::new(offset, self.elevation, half),
                    ),
                ]
            })
            .collect()
    }
}

/// Static scenery around the buildings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub background: Vec3,
    pub ground: GroundPlane,
    pub grid: GridOverlay,
    pub stars: Vec<Vec3>,
}

/// Generated city: the building table plus its environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub buildings: Vec<Building>,
    pub environment: Environment,
}

impl City {
    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.index())
    }

    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id.index())
    }

    /// Applies a mutation to the requested building.
    pub fn update<F, R>(&mut self, id: BuildingId, updater: F) -> Option<R>
    where
        F: FnOnce(&mut Building) -> R,
    {
        self.get_mut(id).map(updater)
    }

    pub fn interactive_count(&self) -> usize {
        self.buildings.iter().filter(|b| b.is_interactive).count()
    }
}

/// Generates the building lattice and scenery.
///
/// Buildings sit at `x = i * spacing`, `z = j * spacing` with integer
/// indices in `-(n / 2)..n - n / 2`, so the lattice is centred on the
/// origin for both even and odd grid sizes.
pub fn build_city<R: Rng + ?Sized>(config: &CityConfig, rng: &mut R) -> City {
    let n = config.grid_size as i32;
    let first = -(n / 2);
    let mut buildings = Vec::with_capacity((n * n) as usize);

    for i in first..first + n {
        for j in first..first + n {
            let height = rng.gen_range(config.height());
            let width = rng.gen_range(config.footprint());
            let depth = rng.gen_range(config.footprint());
            let color = config
                .palette
                .choose(rng)
                .copied()
                .unwrap_or(Vec3::ONE);
            let is_interactive = rng.gen_bool(config.interactive_chance as f64);
            let point_value = rng.gen_range(config.point_range.0..=config.point_range.1);

            let id = BuildingId(buildings.len() as u32);
            buildings.push(Building::new(
                id,
                (i as f32 * config.spacing, j as f32 * config.spacing),
                Vec3::new(width, height, depth),
                color,
                is_interactive,
                point_value,
                config.base_intensity,
            ));
        }
    }

    let environment = build_environment(config, rng);
    log::debug!(
        "generated {} buildings, {} interactive, {} stars",
        buildings.len(),
        buildings.iter().filter(|b| b.is_interactive).count(),
        environment.stars.len()
    );

    City {
        buildings,
        environment,
    }
}

fn build_environment<R: Rng + ?Sized>(config: &CityConfig, rng: &mut R) -> Environment {
    let half = config.star_spread / 2.0;
    let stars = (0..config.star_count)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
            )
        })
        .collect();

    Environment {
        background: hex_color(0x050a30),
        ground: GroundPlane {
            size: config.ground_size,
            color: hex_color(0x0a0a0a),
        },
        grid: GridOverlay {
            size: config.grid_overlay_size,
            divisions: config.grid_divisions,
            color: hex_color(0x00ffff),
            opacity: 0.2,
            elevation: 0.1,
        },
        stars,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn city(seed: u64) -> (CityConfig, City) {
        let config = CityConfig {
            star_count: 16,
            ..CityConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let city = build_city(&config, &mut rng);
        (config, city)
    }

    #[test]
    fn generates_one_building_per_lattice_cell() {
        let (_, city) = city(7);
        assert_eq!(city.buildings.len(), 100);
        let positions: HashSet<(i32, i32)> = city
            .buildings
            .iter()
            .map(|b| (b.position.x as i32, b.position.z as i32))
            .collect();
        assert_eq!(positions.len(), 100);
        let xs: Vec<i32> = (-5..5).map(|i| i * 15).collect();
        for (x, z) in positions {
            assert!(xs.contains(&x), "x={x} off lattice");
            assert!(xs.contains(&z), "z={z} off lattice");
        }
    }

    #[test]
    fn dimensions_and_points_stay_in_range() {
        for seed in 0..8 {
            let (config, city) = city(seed);
            for building in &city.buildings {
                assert!(building.size.x > 0.0 && building.size.y > 0.0 && building.size.z > 0.0);
                assert!(config.height().contains(&building.size.y));
                assert!(config.footprint().contains(&building.size.x));
                assert!(config.footprint().contains(&building.size.z));
                assert!((1..=10).contains(&building.point_value));
                assert!(config.palette.contains(&building.base_color));
                assert_eq!(building.position.y, building.size.y / 2.0);
                assert_eq!(building.original_height, building.size.y);
                assert_eq!(building.animation, AnimationState::Idle);
            }
        }
    }

    #[test]
    fn ids_index_the_table() {
        let (_, city) = city(3);
        for (index, building) in city.buildings.iter().enumerate() {
            assert_eq!(building.id.index(), index);
        }
    }

    #[test]
    fn odd_grid_is_centred() {
        let config = CityConfig {
            grid_size: 3,
            spacing: 10.0,
            star_count: 0,
            ..CityConfig::default()
        };
        let city = build_city(&config, &mut StdRng::seed_from_u64(1));
        let mut xs: Vec<i32> = city.buildings.iter().map(|b| b.position.x as i32).collect();
        xs.sort();
        xs.dedup();
        assert_eq!(xs, vec![-10, 0, 10]);
    }

    #[test]
    fn interactive_share_follows_probability() {
        let config = CityConfig {
            grid_size: 40,
            star_count: 0,
            ..CityConfig::default()
        };
        let city = build_city(&config, &mut StdRng::seed_from_u64(11));
        let share = city.interactive_count() as f32 / city.buildings.len() as f32;
        assert!((0.2..0.4).contains(&share), "share {share}");
    }

    #[test]
    fn environment_matches_config() {
        let (config, city) = city(5);
        let env = &city.environment;
        assert_eq!(env.stars.len(), 16);
        let half = config.star_spread / 2.0;
        assert!(env
            .stars
            .iter()
            .all(|s| s.abs().max_element() <= half));
        assert_eq!(env.grid.segments().len(), 2 * 51);
        assert_eq!(env.ground.size, 500.0);
    }

    #[test]
    fn bounds_follow_growth() {
        let mut building = Building::new(
            BuildingId(0),
            (0.0, 0.0),
            Vec3::new(4.0, 20.0, 6.0),
            Vec3::ONE,
            true,
            3,
            0.2,
        );
        let (min, max) = building.bounds();
        assert_eq!(min, Vec3::new(-2.0, 0.0, -3.0));
        assert_eq!(max, Vec3::new(2.0, 20.0, 3.0));
        building.scale_y = 1.5;
        building.position.y = 15.0;
        let (min, max) = building.bounds();
        assert_eq!(min.y, 0.0);
        assert_eq!(max.y, 30.0);
    }
}
