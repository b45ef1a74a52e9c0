//! Bounds-checked tile grid owned by a world.
//!
//! All coordinate access goes through [`GameMap`]; callers never index the
//! tile vector directly. Out-of-range coordinates read as "no tile" and are
//! never walkable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ResourceKind, TerrainKind};

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile a continuous position is anchored to.
    pub fn from_position(x: f32, y: f32) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
        }
    }

    pub fn center(self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }

    pub fn distance(self, other: TilePos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Euclidean distance from a point to the tile-centre rectangle of a
/// `size`×`size` footprint whose top-left tile is `origin`.
pub fn distance_to_footprint(x: f32, y: f32, origin: TilePos, size: i32) -> f32 {
    let max_x = (origin.x + size - 1) as f32;
    let max_y = (origin.y + size - 1) as f32;
    let cx = x.clamp(origin.x as f32, max_x);
    let cy = y.clamp(origin.y as f32, max_y);
    ((x - cx).powi(2) + (y - cy).powi(2)).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub terrain: TerrainKind,
    pub walkable: bool,
    pub resource: Option<ResourceNode>,
}

impl Tile {
    fn with_terrain(terrain: TerrainKind) -> Self {
        Self {
            terrain,
            walkable: terrain.is_walkable(),
            resource: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameMap {
    size: i32,
    seed: Option<u64>,
    tiles: Vec<Tile>,
}

const SEAT_MARGIN: i32 = 6;
const SEAT_CLEARING: i32 = 7;

impl GameMap {
    /// A flat, all-grass map without resources.
    pub fn new(size: u32) -> Self {
        let size = size.max(1) as i32;
        Self {
            size,
            seed: None,
            tiles: vec![Tile::with_terrain(TerrainKind::Grass); (size * size) as usize],
        }
    }

    /// Procedurally generates a map from `seed`, keeping a clearing with
    /// starter resources around every seat in `seats`.
    pub fn generate(size: u32, seed: u64, seats: &[TilePos]) -> Self {
        let mut map = GameMap::new(size);
        map.seed = Some(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let area = map.size * map.size;

        for _ in 0..(area / 400).max(1) {
            let radius = rng.gen_range(2..=3);
            map.scatter_blob(&mut rng, TerrainKind::Water, radius);
        }
        for _ in 0..(area / 500).max(1) {
            let radius = rng.gen_range(1..=2);
            map.scatter_blob(&mut rng, TerrainKind::Mountain, radius);
        }
        for _ in 0..(area / 250).max(1) {
            let radius = rng.gen_range(2..=4);
            map.scatter_blob(&mut rng, TerrainKind::Forest, radius);
        }

        for index in 0..map.tiles.len() {
            let tile = &mut map.tiles[index];
            if tile.terrain == TerrainKind::Forest && rng.gen_bool(0.35) {
                tile.resource = Some(ResourceNode {
                    kind: ResourceKind::Wood,
                    quantity: 150,
                });
            }
        }

        for _ in 0..(area / 300).max(1) {
            let kind = match rng.gen_range(0..3) {
                0 => ResourceKind::Food,
                1 => ResourceKind::Stone,
                _ => ResourceKind::Gold,
            };
            let center = map.random_pos(&mut rng);
            map.place_cluster(center, kind, 4);
        }

        for seat in seats {
            map.clear_seat(*seat);
        }

        map
    }

    fn random_pos(&self, rng: &mut StdRng) -> TilePos {
        TilePos::new(rng.gen_range(0..self.size), rng.gen_range(0..self.size))
    }

    fn scatter_blob(&mut self, rng: &mut StdRng, terrain: TerrainKind, radius: i32) {
        let center = self.random_pos(rng);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_terrain(center.offset(dx, dy), terrain);
                }
            }
        }
    }

    fn place_cluster(&mut self, center: TilePos, kind: ResourceKind, count: i32) {
        let quantity = match kind {
            ResourceKind::Food => 100,
            ResourceKind::Wood => 150,
            ResourceKind::Stone | ResourceKind::Gold => 300,
        };
        const OFFSETS: [(i32, i32); 6] = [(0, 0), (1, 0), (0, 1), (1, 1), (-1, 0), (0, -1)];
        for (dx, dy) in OFFSETS.iter().take(count.max(0) as usize) {
            let pos = center.offset(*dx, *dy);
            if self.is_walkable(pos) {
                self.set_resource(pos, Some(ResourceNode { kind, quantity }));
            }
        }
    }

    fn clear_seat(&mut self, seat: TilePos) {
        for dy in -SEAT_CLEARING..=SEAT_CLEARING {
            for dx in -SEAT_CLEARING..=SEAT_CLEARING {
                let pos = seat.offset(dx, dy);
                if let Some(tile) = self.tile_at_mut(pos) {
                    *tile = Tile::with_terrain(TerrainKind::Grass);
                }
            }
        }
        // Starter food and wood within a short walk of the town center.
        self.place_cluster(seat.offset(5, 0), ResourceKind::Food, 4);
        self.place_cluster(seat.offset(0, 5), ResourceKind::Wood, 6);
    }

    pub fn size(&self) -> u32 {
        self.size as u32
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.size && pos.y < self.size
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.size + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn tile_at(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    fn tile_at_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        let index = self.index(pos)?;
        self.tiles.get_mut(index)
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.tile_at(pos).map(|t| t.walkable).unwrap_or(false)
    }

    /// Returns false when `pos` is out of bounds.
    pub fn set_walkable(&mut self, pos: TilePos, walkable: bool) -> bool {
        match self.tile_at_mut(pos) {
            Some(tile) => {
                tile.walkable = walkable;
                true
            }
            None => false,
        }
    }

    pub fn set_terrain(&mut self, pos: TilePos, terrain: TerrainKind) {
        if let Some(tile) = self.tile_at_mut(pos) {
            tile.terrain = terrain;
            tile.walkable = terrain.is_walkable();
            if !tile.walkable {
                tile.resource = None;
            }
        }
    }

    pub fn set_resource(&mut self, pos: TilePos, resource: Option<ResourceNode>) {
        if let Some(tile) = self.tile_at_mut(pos) {
            tile.resource = resource.filter(|node| node.quantity > 0);
        }
    }

    pub fn resource_at(&self, pos: TilePos) -> Option<ResourceNode> {
        self.tile_at(pos).and_then(|t| t.resource)
    }

    /// Removes up to `max` units from the node at `pos`. An exhausted node is
    /// cleared from the tile.
    pub fn take_resource(&mut self, pos: TilePos, max: u32) -> Option<(ResourceKind, u32)> {
        let tile = self.tile_at_mut(pos)?;
        let node = tile.resource.as_mut()?;
        let amount = max.min(node.quantity);
        node.quantity -= amount;
        let kind = node.kind;
        if node.quantity == 0 {
            tile.resource = None;
        }
        Some((kind, amount))
    }

    /// Nearest node of `kind` within `radius` tiles of `from`.
    pub fn nearest_resource(&self, from: TilePos, kind: ResourceKind, radius: i32) -> Option<TilePos> {
        let mut best: Option<(f32, TilePos)> = None;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let pos = from.offset(dx, dy);
                let matches = self
                    .resource_at(pos)
                    .map(|node| node.kind == kind)
                    .unwrap_or(false);
                if matches && self.is_walkable(pos) {
                    let distance = from.distance(pos);
                    if best.map(|(d, _)| distance < d).unwrap_or(true) {
                        best = Some((distance, pos));
                    }
                }
            }
        }
        best.map(|(_, pos)| pos)
    }

    /// Every remaining resource node, in row-major order.
    pub fn resource_nodes(&self) -> impl Iterator<Item = (TilePos, ResourceNode)> + '_ {
        self.tiles.iter().enumerate().filter_map(move |(index, tile)| {
            let index = index as i32;
            tile.resource
                .map(|node| (TilePos::new(index % self.size, index / self.size), node))
        })
    }

    /// Iterates the tiles of a `size`×`size` footprint.
    pub fn footprint(origin: TilePos, size: i32) -> impl Iterator<Item = TilePos> {
        (0..size).flat_map(move |dy| (0..size).map(move |dx| origin.offset(dx, dy)))
    }

    /// Finds a walkable tile next to a footprint for a freshly produced unit.
    ///
    /// A short list of preferred offsets around the footprint is tried first,
    /// then boxes of growing radius are scanned, taking the walkable border
    /// tile closest to the footprint centre.
    pub fn find_spawn_tile(&self, origin: TilePos, size: i32, max_radius: i32) -> Option<TilePos> {
        let mid = size / 2;
        let preferred = [
            origin.offset(mid, size),
            origin.offset(size, mid),
            origin.offset(-1, mid),
            origin.offset(mid, -1),
            origin.offset(size, size),
            origin.offset(-1, size),
            origin.offset(size, -1),
            origin.offset(-1, -1),
        ];
        if let Some(pos) = preferred.iter().find(|pos| self.is_walkable(**pos)) {
            return Some(*pos);
        }

        let center_x = origin.x as f32 + (size - 1) as f32 / 2.0;
        let center_y = origin.y as f32 + (size - 1) as f32 / 2.0;
        for radius in 1..=max_radius {
            let min_x = origin.x - radius;
            let min_y = origin.y - radius;
            let max_x = origin.x + size - 1 + radius;
            let max_y = origin.y + size - 1 + radius;
            let mut best: Option<(f32, TilePos)> = None;

            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let on_border = x == min_x || x == max_x || y == min_y || y == max_y;
                    let pos = TilePos::new(x, y);
                    if !on_border || !self.is_walkable(pos) {
                        continue;
                    }
                    let distance = (x as f32 - center_x).hypot(y as f32 - center_y);
                    if best.map(|(d, _)| distance < d).unwrap_or(true) {
                        best = Some((distance, pos));
                    }
                }
            }

            if let Some((_, pos)) = best {
                return Some(pos);
            }
        }

        None
    }
}

/// Town center positions for `count` players, in seat order.
pub fn seat_positions(map_size: u32, count: usize) -> Vec<TilePos> {
    let size = map_size as i32;
    let far = (size - SEAT_MARGIN - 3).max(0);
    let mid = (size / 2 - 1).max(0);
    let seats = [
        TilePos::new(SEAT_MARGIN, SEAT_MARGIN),
        TilePos::new(far, far),
        TilePos::new(far, SEAT_MARGIN),
        TilePos::new(SEAT_MARGIN, far),
        TilePos::new(mid, SEAT_MARGIN),
        TilePos::new(mid, far),
        TilePos::new(SEAT_MARGIN, mid),
        TilePos::new(far, mid),
    ];
    seats.iter().cycle().take(count).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_access() {
        let mut map = GameMap::new(8);
        assert!(map.tile_at(TilePos::new(-1, 0)).is_none());
        assert!(map.tile_at(TilePos::new(0, 8)).is_none());
        assert!(!map.is_walkable(TilePos::new(8, 8)));
        assert!(!map.set_walkable(TilePos::new(-3, 2), false));
        assert!(map.set_walkable(TilePos::new(7, 7), false));
        assert!(!map.is_walkable(TilePos::new(7, 7)));
    }

    #[test]
    fn test_take_resource_clears_exhausted_node() {
        let mut map = GameMap::new(8);
        let pos = TilePos::new(3, 3);
        map.set_resource(
            pos,
            Some(ResourceNode {
                kind: ResourceKind::Gold,
                quantity: 15,
            }),
        );

        assert_eq!(map.take_resource(pos, 10), Some((ResourceKind::Gold, 10)));
        assert_eq!(map.resource_at(pos).map(|n| n.quantity), Some(5));
        assert_eq!(map.take_resource(pos, 10), Some((ResourceKind::Gold, 5)));
        assert!(map.resource_at(pos).is_none());
        assert_eq!(map.take_resource(pos, 10), None);
    }

    #[test]
    fn test_generation_is_seeded() {
        let seats = seat_positions(48, 2);
        let a = GameMap::generate(48, 1234, &seats);
        let b = GameMap::generate(48, 1234, &seats);
        assert_eq!(a.tiles, b.tiles);
        assert_eq!(a.seed(), Some(1234));
    }

    #[test]
    fn test_generation_clears_seats_and_places_starter_food() {
        let seats = seat_positions(64, 4);
        let map = GameMap::generate(64, 99, &seats);

        for seat in &seats {
            for pos in GameMap::footprint(*seat, 3) {
                assert!(map.is_walkable(pos), "seat tile {:?} blocked", pos);
                assert!(map.resource_at(pos).is_none());
            }
            assert!(map
                .nearest_resource(*seat, ResourceKind::Food, 8)
                .is_some());
        }
    }

    #[test]
    fn test_spawn_prefers_tile_below_footprint() {
        let map = GameMap::new(16);
        let spawn = map.find_spawn_tile(TilePos::new(4, 4), 3, 4);
        assert_eq!(spawn, Some(TilePos::new(5, 7)));
    }

    #[test]
    fn test_spawn_falls_back_to_box_scan() {
        let mut map = GameMap::new(16);
        let origin = TilePos::new(5, 5);
        // Block the whole first ring around a 2x2 footprint.
        for y in 4..=7 {
            for x in 4..=7 {
                map.set_walkable(TilePos::new(x, y), false);
            }
        }
        let spawn = map.find_spawn_tile(origin, 2, 4).unwrap();
        assert!(map.is_walkable(spawn));
        assert!(spawn.x == 3 || spawn.x == 8 || spawn.y == 3 || spawn.y == 8);
    }

    #[test]
    fn test_spawn_gives_up_when_enclosed() {
        let mut map = GameMap::new(6);
        for y in 0..6 {
            for x in 0..6 {
                map.set_walkable(TilePos::new(x, y), false);
            }
        }
        assert_eq!(map.find_spawn_tile(TilePos::new(2, 2), 2, 5), None);
    }

    #[test]
    fn test_distance_to_footprint() {
        let origin = TilePos::new(4, 4);
        assert_eq!(distance_to_footprint(5.0, 5.0, origin, 3), 0.0);
        assert_eq!(distance_to_footprint(3.0, 5.0, origin, 3), 1.0);
        assert!((distance_to_footprint(3.0, 3.0, origin, 3) - 2f32.sqrt()).abs() < 1e-5);
    }
}
