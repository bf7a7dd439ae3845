/// Tile types and the layered grid they live in.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,
    Solid,    // Platform tile with collision
    Scenery,  // Drawn, never collides (background, decorative platform art)
    Water,    // Lethal on touch
}

impl Tile {
    /// Does this tile block the player's body?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Solid)
    }

    /// Does touching this tile end the game?
    pub fn is_lethal(self) -> bool {
        matches!(self, Tile::Water)
    }

    /// Is anything drawn for this tile?
    pub fn is_visible(self) -> bool {
        !matches!(self, Tile::Empty)
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Empty
    }
}

/// One rectangular tile layer, row-major.
///
/// Out-of-bounds queries return `Tile::Empty`: the map edge is open space
/// and world bounds are enforced by the physics layer instead.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        TileGrid { width, height, cells: vec![Tile::Empty; width * height] }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Tile {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Tile::Empty
        }
    }

    /// Signed lookup for collision code that probes beyond the edges.
    #[inline]
    pub fn get_signed(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 { return Tile::Empty; }
        self.get(x as usize, y as usize)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, tile: Tile) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = tile;
        }
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.cells.iter().filter(|&&t| t == tile).count()
    }
}
