use crate::core::{bounds::Bounds, geo::LatLng, geo::Point};
use crate::prelude::HashMap;
use crate::{MapError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

const EARTH_RADIUS: f64 = 6378137.0;
const MAX_LATITUDE: f64 = 85.0511287798;

/// Tile sizes a tiled-CRS definition may declare; anything else falls back
/// to the default.
pub const VALID_TILE_SIZES: [u32; 5] = [256, 512, 1024, 2048, 4096];
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Projection codes that ship with every registry.
pub const BUILTIN_CODES: [&str; 4] = ["CBMTILE", "APSTILE", "OSMTILE", "WGS84"];

/// Coordinate math available for a tiled CRS. Definitions registered from
/// JSON carry their proj4 string as data only; forward/inverse math is built
/// in for spherical Mercator and plain geographic axes, and view math that
/// needs anything else degrades to zoom-range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsKind {
    SphericalMercator,
    Geographic,
    Custom,
}

/// A tiled coordinate reference system: projected extent, tile-grid origin
/// and the resolution (projected units per pixel) ladder indexed by zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub code: String,
    pub proj4: String,
    pub kind: CrsKind,
    pub origin: Point,
    pub bounds: Bounds,
    pub resolutions: Vec<f64>,
    pub tile_size: u32,
}

impl Projection {
    /// The highest zoom index the resolution ladder defines.
    pub fn max_zoom(&self) -> u8 {
        (self.resolutions.len().saturating_sub(1)) as u8
    }

    /// Projected units per pixel at the given zoom, if defined.
    pub fn resolution(&self, zoom: u8) -> Option<f64> {
        self.resolutions.get(zoom as usize).copied()
    }

    /// Clamps a requested zoom to the ladder.
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.min(self.max_zoom())
    }

    /// Forward-projects a geographic coordinate into PCRS units, when the
    /// CRS math is built in.
    pub fn project(&self, lat_lng: &LatLng) -> Option<Point> {
        match self.kind {
            CrsKind::SphericalMercator => {
                let lat = lat_lng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
                let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
                let y = ((PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;
                Some(Point::new(x, y))
            }
            CrsKind::Geographic => Some(Point::new(lat_lng.lng, lat_lng.lat)),
            CrsKind::Custom => None,
        }
    }

    /// Inverse of [`Projection::project`].
    pub fn unproject(&self, point: &Point) -> Option<LatLng> {
        match self.kind {
            CrsKind::SphericalMercator => {
                let lng = (point.x / EARTH_RADIUS).to_degrees();
                let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
                Some(LatLng::new(lat, lng))
            }
            CrsKind::Geographic => Some(LatLng::new(point.y, point.x)),
            CrsKind::Custom => None,
        }
    }

    /// OpenStreetMap web-Mercator tile grid (EPSG:3857).
    pub fn osmtile() -> Self {
        Self {
            code: "OSMTILE".to_string(),
            proj4: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wgs84=0,0,0 +no_defs".to_string(),
            kind: CrsKind::SphericalMercator,
            origin: Point::new(-20037508.342787, 20037508.342787),
            bounds: Bounds::from_corners(
                [-20037508.342787, -20037508.342787],
                [20037508.342787, 20037508.342787],
            ),
            resolutions: OSMTILE_RESOLUTIONS.to_vec(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Canada Base Map Lambert conformal conic tile grid (EPSG:3978).
    pub fn cbmtile() -> Self {
        Self {
            code: "CBMTILE".to_string(),
            proj4: "+proj=lcc +lat_1=49 +lat_2=77 +lat_0=49 +lon_0=-95 +x_0=0 +y_0=0 +ellps=GRS80 +datum=NAD83 +units=m +no_defs".to_string(),
            kind: CrsKind::Custom,
            origin: Point::new(-34655800.0, 39310000.0),
            bounds: Bounds::from_corners([-34655800.0, -39000000.0], [10000000.0, 39310000.0]),
            resolutions: CBMTILE_RESOLUTIONS.to_vec(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Alaska polar stereographic tile grid (EPSG:5936).
    pub fn apstile() -> Self {
        Self {
            code: "APSTILE".to_string(),
            proj4: "+proj=stere +lat_0=90 +lat_ts=50 +lon_0=-150 +k=0.994 +x_0=2000000 +y_0=2000000 +datum=WGS84 +units=m +no_defs".to_string(),
            kind: CrsKind::Custom,
            origin: Point::new(-28567784.109255, 32567784.109255),
            bounds: Bounds::from_corners(
                [-28567784.109254867, -28567784.109254755],
                [32567784.109255023, 32567784.10925506],
            ),
            resolutions: APSTILE_RESOLUTIONS.to_vec(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Plate carrée geographic tile grid (EPSG:4326).
    pub fn wgs84() -> Self {
        Self {
            code: "WGS84".to_string(),
            proj4: "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs".to_string(),
            kind: CrsKind::Geographic,
            origin: Point::new(-180.0, 90.0),
            bounds: Bounds::from_corners([-180.0, -90.0], [180.0, 90.0]),
            resolutions: WGS84_RESOLUTIONS.to_vec(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

const OSMTILE_RESOLUTIONS: [f64; 25] = [
    156543.0339,
    78271.51695,
    39135.758475,
    19567.8792375,
    9783.93961875,
    4891.969809375,
    2445.9849046875,
    1222.9924523438,
    611.49622617188,
    305.74811308594,
    152.87405654297,
    76.437028271484,
    38.218514135742,
    19.109257067871,
    9.5546285339355,
    4.7773142669678,
    2.3886571334839,
    1.1943285667419,
    0.59716428337097,
    0.29858214168549,
    0.14929107084274,
    0.074645535421371,
    0.03732276771068573,
    0.018661383855342865,
    0.009330691927671432495,
];

const CBMTILE_RESOLUTIONS: [f64; 26] = [
    38364.660062653464,
    22489.62831258996,
    13229.193125052918,
    7937.5158750317505,
    4630.2175937685215,
    2645.8386250105837,
    1587.5031750063501,
    926.0435187537042,
    529.1677250021168,
    317.50063500127004,
    185.20870375074085,
    111.12522225044451,
    66.1459656252646,
    38.36466006265346,
    22.48962831258996,
    13.229193125052918,
    7.9375158750317505,
    4.6302175937685215,
    2.6458386250105836,
    1.5875031750063502,
    0.92604351875370428,
    0.52916772500211673,
    0.31750063500127002,
    0.18520870375074083,
    0.11112522225044451,
    0.066145965625264591,
];

const APSTILE_RESOLUTIONS: [f64; 20] = [
    238810.813354,
    119405.406677,
    59702.7033384999,
    29851.3516692501,
    14925.675834625,
    7462.83791731252,
    3731.41895865639,
    1865.70947932806,
    932.854739664032,
    466.427369832148,
    233.213684916074,
    116.606842458037,
    58.3034212288862,
    29.1517106145754,
    14.5758553072877,
    7.28792765351156,
    3.64396382688807,
    1.82198191331174,
    0.910990956788164,
    0.45549547826179,
];

const WGS84_RESOLUTIONS: [f64; 22] = [
    0.703125,
    0.3515625,
    0.17578125,
    0.087890625,
    0.0439453125,
    0.02197265625,
    0.010986328125,
    0.0054931640625,
    0.00274658203125,
    0.001373291015625,
    0.0006866455078125,
    0.0003433227539062,
    0.0001716613769531,
    0.0000858306884766,
    0.0000429153442383,
    0.0000214576721191,
    0.0000107288360596,
    0.0000053644180298,
    0.0000026822090149,
    0.0000013411045074,
    0.0000006705522537,
    0.0000003352761269,
];

static BUILTINS: Lazy<Vec<Arc<Projection>>> = Lazy::new(|| {
    vec![
        Arc::new(Projection::cbmtile()),
        Arc::new(Projection::apstile()),
        Arc::new(Projection::osmtile()),
        Arc::new(Projection::wgs84()),
    ]
});

/// A custom tiled-CRS definition parsed from JSON. All members except
/// `tilesize` are required at registration time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TcrsTemplate {
    pub projection: Option<String>,
    #[serde(rename = "proj4string")]
    pub proj4_string: Option<String>,
    pub resolutions: Option<Vec<f64>>,
    pub origin: Option<[f64; 2]>,
    pub bounds: Option<[[f64; 2]; 2]>,
    pub tilesize: Option<u32>,
}

/// Projection table owned by a single viewer. Codes are stored and looked
/// up uppercased; every registry starts out seeded with the four built-in
/// tile grids.
#[derive(Clone)]
pub struct ProjectionRegistry {
    table: HashMap<String, Arc<Projection>>,
}

impl ProjectionRegistry {
    pub fn new() -> Self {
        let mut table = HashMap::default();
        for projection in BUILTINS.iter() {
            table.insert(projection.code.clone(), Arc::clone(projection));
        }
        Self { table }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, code: &str) -> Option<Arc<Projection>> {
        self.table.get(&code.to_uppercase()).cloned()
    }

    /// Registers a custom tiled CRS. Validation mirrors the authoring
    /// contract: every required member must be present (an empty resolution
    /// ladder counts as missing), a `:` is not permitted in the name, and a
    /// name that is already registered is returned as-is without replacing
    /// the existing definition. An out-of-catalog tile size falls back to
    /// the default.
    pub fn register(&mut self, template: TcrsTemplate) -> Result<String> {
        let code = template
            .projection
            .ok_or(MapError::IncompleteTcrsDefinition("projection"))?;
        let proj4 = template
            .proj4_string
            .filter(|s| !s.is_empty())
            .ok_or(MapError::IncompleteTcrsDefinition("proj4string"))?;
        let resolutions = template
            .resolutions
            .filter(|r| !r.is_empty())
            .ok_or(MapError::IncompleteTcrsDefinition("resolutions"))?;
        let origin = template
            .origin
            .ok_or(MapError::IncompleteTcrsDefinition("origin"))?;
        let bounds = template
            .bounds
            .ok_or(MapError::IncompleteTcrsDefinition("bounds"))?;

        if code.contains(':') {
            return Err(MapError::InvalidProjectionName(code));
        }

        let code = code.to_uppercase();
        if self.table.contains_key(&code) {
            return Ok(code);
        }

        let tile_size = match template.tilesize {
            Some(size) if VALID_TILE_SIZES.contains(&size) => size,
            _ => DEFAULT_TILE_SIZE,
        };

        let projection = Projection {
            code: code.clone(),
            proj4,
            kind: CrsKind::Custom,
            origin: Point::new(origin[0], origin[1]),
            bounds: Bounds::from_corners(bounds[0], bounds[1]),
            resolutions,
            tile_size,
        };
        self.table.insert(code.clone(), Arc::new(projection));
        Ok(code)
    }
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
