/// Tiled JSON map reader (`.tmj` / `.json`, orthogonal, CSV-style data).
///
/// ## Layer roles
///
/// Roles are picked by case-insensitive name prefix, so `Platformer2`,
/// `platform` and `Platforms` all mean the platform layer:
///
///   tile layers:    `background*`  `platform*`  `water*`
///   object groups:  `playerspawn*` / `spawn*`  `coin*`  `diamond*`
///                   `heart*`  `key*`  `spike*`  `door*` / `doo*`
///
/// Group layers are flattened. Unknown layers are ignored, and a missing
/// object group simply means zero objects of that kind.
///
/// ## Collision
///
/// A platform tile collides when its tileset entry carries a `collides`
/// property set to true. Maps whose tilesets never mention `collides`
/// (external tilesets, hand-made maps) treat every platform tile as solid.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::domain::entity::{Door, Item, ItemKind, Rect, Spike};
use crate::domain::tile::{Tile, TileGrid};
use super::level::{LevelDef, LevelError};

/// Tiled stores flip/rotation flags in the top four bits of a gid.
const GID_MASK: u32 = 0x0FFF_FFFF;

/// Largest accepted map side, in tiles.
const MAX_MAP_SIDE: usize = 4096;

#[derive(Deserialize, Debug)]
struct TiledMap {
    width: usize,
    height: usize,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    infinite: bool,
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default)]
    tilesets: Vec<Tileset>,
    #[serde(default)]
    properties: Vec<Property>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Layer {
    TileLayer(TileLayer),
    ObjectGroup(ObjectGroup),
    Group(GroupLayer),
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
struct TileLayer {
    #[serde(default)]
    name: String,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default)]
    data: Option<LayerData>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum LayerData {
    Gids(Vec<u32>),
    Encoded(String),
}

#[derive(Deserialize, Debug)]
struct ObjectGroup {
    #[serde(default)]
    name: String,
    #[serde(default)]
    objects: Vec<MapObject>,
}

#[derive(Deserialize, Debug)]
struct GroupLayer {
    #[serde(default)]
    layers: Vec<Layer>,
}

#[derive(Deserialize, Debug)]
struct MapObject {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    gid: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct Tileset {
    #[serde(default)]
    firstgid: u32,
    #[serde(default)]
    tiles: Vec<TileDef>,
}

#[derive(Deserialize, Debug)]
struct TileDef {
    id: u32,
    #[serde(default)]
    properties: Vec<Property>,
}

#[derive(Deserialize, Debug)]
struct Property {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Read and convert one map file. The file stem names the level unless the
/// map carries a `name` property.
pub fn load_tiled(path: &Path) -> Result<LevelDef, LevelError> {
    let text = std::fs::read_to_string(path)?;
    let stem = path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    parse_tiled(&text, &stem)
}

pub fn parse_tiled(text: &str, fallback_name: &str) -> Result<LevelDef, LevelError> {
    let map: TiledMap = serde_json::from_str(text)?;
    convert(map, fallback_name)
}

// ══════════════════════════════════════════════════════════════
// Conversion
// ══════════════════════════════════════════════════════════════

fn convert(map: TiledMap, fallback_name: &str) -> Result<LevelDef, LevelError> {
    if map.infinite {
        return Err(LevelError::Unsupported("infinite maps".to_string()));
    }
    if map.tilewidth == 0 || map.tilewidth != map.tileheight {
        return Err(LevelError::Unsupported(format!(
            "tile size {}x{} (tiles must be square)", map.tilewidth, map.tileheight,
        )));
    }
    let ts = map.tilewidth as f32;
    let (w, h) = (map.width, map.height);
    if w == 0 || h == 0 || w > MAX_MAP_SIDE || h > MAX_MAP_SIDE || w.checked_mul(h).is_none() {
        return Err(LevelError::Unsupported(format!(
            "map size {}x{} (1 to {} tiles per side)", w, h, MAX_MAP_SIDE,
        )));
    }

    let collides = collision_gids(&map.tilesets);
    let is_solid_gid = |gid: u32| match &collides {
        Some(set) => set.contains(&gid),
        None => true,
    };

    let mut flat = vec![];
    flatten(map.layers, &mut flat);

    let mut background = TileGrid::new(w, h);
    let mut platforms = None;
    let mut water = None;
    let mut spawn = None;
    let mut items = vec![];
    let mut spikes = vec![];
    let mut doors = vec![];

    for layer in flat {
        match layer {
            Layer::TileLayer(tl) => {
                let role = tl.name.to_ascii_lowercase();
                if role.starts_with("background") {
                    background = grid_from_layer(&tl, w, h, |_| Tile::Scenery)?;
                } else if role.starts_with("platform") {
                    platforms = Some(grid_from_layer(&tl, w, h, |gid| {
                        if is_solid_gid(gid) { Tile::Solid } else { Tile::Scenery }
                    })?);
                } else if role.starts_with("water") {
                    water = Some(grid_from_layer(&tl, w, h, |_| Tile::Water)?);
                } else {
                    log::debug!("ignoring tile layer '{}'", tl.name);
                }
            }
            Layer::ObjectGroup(og) => {
                let role = og.name.to_ascii_lowercase();
                let rects = og.objects.iter().map(|o| object_rect(o, ts));
                if role.starts_with("playerspawn") || role.starts_with("spawn") {
                    spawn = og.objects.first().map(|o| object_rect(o, ts).center());
                } else if let Some(kind) = item_role(&role) {
                    items.extend(rects.map(|r| Item::new(kind, r)));
                } else if role.starts_with("spike") {
                    spikes.extend(rects.map(|rect| Spike { rect }));
                } else if role.starts_with("doo") {
                    doors.extend(rects.map(|rect| Door { rect }));
                } else {
                    log::debug!("ignoring object group '{}'", og.name);
                }
            }
            Layer::Group(_) | Layer::Other => {}
        }
    }

    let platforms = platforms.ok_or(LevelError::MissingLayer("platform"))?;
    let name = map.properties.iter()
        .find(|p| p.name == "name")
        .and_then(|p| p.value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_name.to_string());

    Ok(LevelDef { name, tile_size: ts, background, platforms, water, spawn, items, spikes, doors })
}

fn item_role(role: &str) -> Option<ItemKind> {
    if role.starts_with("coin") {
        Some(ItemKind::Coin)
    } else if role.starts_with("diamond") {
        Some(ItemKind::Diamond)
    } else if role.starts_with("heart") {
        Some(ItemKind::Heart)
    } else if role.starts_with("key") {
        Some(ItemKind::Key)
    } else {
        None
    }
}

/// Depth-first, keeping draw order.
fn flatten(layers: Vec<Layer>, out: &mut Vec<Layer>) {
    for layer in layers {
        match layer {
            Layer::Group(g) => flatten(g.layers, out),
            other => out.push(other),
        }
    }
}

/// Gids with `collides = true`, or None when no tile declares `collides` at all.
fn collision_gids(tilesets: &[Tileset]) -> Option<HashSet<u32>> {
    let mut declared = false;
    let mut set = HashSet::new();
    for ts in tilesets {
        for tile in &ts.tiles {
            for prop in tile.properties.iter().filter(|p| p.name == "collides") {
                declared = true;
                if prop.value.as_bool() == Some(true) {
                    set.insert(ts.firstgid + tile.id);
                }
            }
        }
    }
    if declared { Some(set) } else { None }
}

fn grid_from_layer(
    layer: &TileLayer,
    w: usize,
    h: usize,
    classify: impl Fn(u32) -> Tile,
) -> Result<TileGrid, LevelError> {
    let gids = match &layer.data {
        Some(LayerData::Gids(gids)) => gids,
        Some(LayerData::Encoded(_)) => {
            let enc = layer.encoding.as_deref().unwrap_or("base64");
            return Err(LevelError::Unsupported(format!(
                "{} encoded data in layer '{}' (save as CSV)", enc, layer.name,
            )));
        }
        None => return Err(LevelError::Unsupported(format!("layer '{}' has no data", layer.name))),
    };
    if (layer.width != 0 && layer.width != w)
        || (layer.height != 0 && layer.height != h)
        || gids.len() != w * h
    {
        return Err(LevelError::LayerSize {
            layer: layer.name.clone(),
            expected: w * h,
            found: gids.len(),
        });
    }

    let mut grid = TileGrid::new(w, h);
    for (i, &raw) in gids.iter().enumerate() {
        let gid = raw & GID_MASK;
        if gid == 0 { continue; }
        grid.set(i % w, i / w, classify(gid));
    }
    Ok(grid)
}

/// Object bounds in world pixels. Tile objects hang from their bottom-left
/// corner; points become a one-tile box centred on the point.
fn object_rect(obj: &MapObject, ts: f32) -> Rect {
    if obj.gid.is_some() {
        let (w, h) = if obj.width > 0.0 && obj.height > 0.0 { (obj.width, obj.height) } else { (ts, ts) };
        Rect::new(obj.x, obj.y - h, w, h)
    } else if obj.width <= 0.0 || obj.height <= 0.0 {
        Rect::from_center(obj.x, obj.y, ts, ts)
    } else {
        Rect::new(obj.x, obj.y, obj.width, obj.height)
    }
}
