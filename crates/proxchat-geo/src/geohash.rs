//! Geohash encode/decode and Moore-neighborhood lookup.

/// Base-32 alphabet used by the geohash encoding.
const BASE32: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// The bounding box enclosed by a cell code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }

    /// Latitude extent in degrees.
    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Longitude extent in degrees.
    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    /// Whether the box contains a point. Inclusive on all edges.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lon >= self.lon_min && lon <= self.lon_max
    }
}

/// Encode a position into a cell code of the given precision.
///
/// Bits are interleaved starting with longitude; every 5 bits emit one
/// base-32 character. Boundary coordinates (`lat = ±90`, `lon = ±180`)
/// are valid and land in the outermost cells.
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> String {
    let mut cell = String::with_capacity(precision);
    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lon_min, mut lon_max) = (-180.0_f64, 180.0_f64);
    let mut even_bit = true;
    let mut ch: usize = 0;
    let mut bit = 0;

    while cell.len() < precision {
        if even_bit {
            let mid = (lon_min + lon_max) / 2.0;
            if longitude > mid {
                ch |= 1 << (4 - bit);
                lon_min = mid;
            } else {
                lon_max = mid;
            }
        } else {
            let mid = (lat_min + lat_max) / 2.0;
            if latitude > mid {
                ch |= 1 << (4 - bit);
                lat_min = mid;
            } else {
                lat_max = mid;
            }
        }

        even_bit = !even_bit;

        if bit < 4 {
            bit += 1;
        } else {
            cell.push(BASE32[ch] as char);
            bit = 0;
            ch = 0;
        }
    }

    cell
}

/// Decode a cell code back into its enclosing bounding box.
///
/// Returns `None` if the code contains a character outside the base-32
/// alphabet.
pub fn decode(cell: &str) -> Option<BoundingBox> {
    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lon_min, mut lon_max) = (-180.0_f64, 180.0_f64);
    let mut even_bit = true;

    for c in cell.bytes() {
        let idx = BASE32.iter().position(|&b| b == c)?;

        for i in (0..5).rev() {
            let bit = (idx >> i) & 1;
            if even_bit {
                let mid = (lon_min + lon_max) / 2.0;
                if bit == 1 {
                    lon_min = mid;
                } else {
                    lon_max = mid;
                }
            } else {
                let mid = (lat_min + lat_max) / 2.0;
                if bit == 1 {
                    lat_min = mid;
                } else {
                    lat_max = mid;
                }
            }
            even_bit = !even_bit;
        }
    }

    Some(BoundingBox {
        lat_min,
        lat_max,
        lon_min,
        lon_max,
    })
}

/// The Moore neighborhood of a cell: up to 8 cells of the same precision
/// immediately adjacent to it.
///
/// Neighbors are derived numerically from the decoded bounding box
/// (center offset by one cell span and re-encoded), which stays correct
/// across base-32 row/column seams. Longitude wraps at the antimeridian;
/// rows beyond the poles do not exist, so polar cells return fewer than
/// 8 neighbors.
pub fn neighbors(cell: &str) -> Vec<String> {
    let Some(bbox) = decode(cell) else {
        return Vec::new();
    };
    if cell.is_empty() {
        return Vec::new();
    }

    let (center_lat, center_lon) = bbox.center();
    let lat_span = bbox.lat_span();
    let lon_span = bbox.lon_span();
    let precision = cell.len();

    let mut out = Vec::with_capacity(8);
    for d_lat in [-1i8, 0, 1] {
        for d_lon in [-1i8, 0, 1] {
            if d_lat == 0 && d_lon == 0 {
                continue;
            }

            let lat = center_lat + f64::from(d_lat) * lat_span;
            if !(-90.0..=90.0).contains(&lat) {
                continue;
            }

            let mut lon = center_lon + f64::from(d_lon) * lon_span;
            if lon > 180.0 {
                lon -= 360.0;
            } else if lon < -180.0 {
                lon += 360.0;
            }

            let neighbor = encode(lat, lon, precision);
            if neighbor != cell && !out.contains(&neighbor) {
                out.push(neighbor);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_cell() {
        // Lower Manhattan.
        assert_eq!(encode(40.7128, -74.0060, 7), "dr5regw");
        assert_eq!(encode(40.7128, -74.0060, 5), "dr5re");
    }

    #[test]
    fn encode_is_deterministic() {
        let a = encode(48.858, 2.294, 7);
        let b = encode(48.858, 2.294, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn decode_contains_encoded_point() {
        for &(lat, lon) in &[
            (40.7128, -74.0060),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (89.999, 179.999),
            (-89.999, -179.999),
        ] {
            let cell = encode(lat, lon, 7);
            let bbox = decode(&cell).unwrap();
            assert!(bbox.contains(lat, lon), "{cell} should contain ({lat}, {lon})");
        }
    }

    #[test]
    fn decode_rejects_invalid_alphabet() {
        // 'a', 'i', 'l', 'o' are not base-32 geohash characters.
        assert!(decode("dr5rega").is_none());
        assert!(decode("il").is_none());
    }

    #[test]
    fn boundary_coordinates_encode() {
        let north = encode(90.0, 0.0, 7);
        let south = encode(-90.0, 0.0, 7);
        assert!(decode(&north).unwrap().lat_max >= 90.0 - 1e-9);
        assert!(decode(&south).unwrap().lat_min <= -90.0 + 1e-9);
    }

    #[test]
    fn neighbors_form_moore_neighborhood() {
        let cell = "dr5regw";
        let ns = neighbors(cell);
        assert_eq!(ns.len(), 8);
        assert!(!ns.contains(&cell.to_string()));

        // Each neighbor's center is exactly one cell span away.
        let bbox = decode(cell).unwrap();
        let (clat, clon) = bbox.center();
        for n in &ns {
            assert_eq!(n.len(), cell.len());
            let (nlat, nlon) = decode(n).unwrap().center();
            let lat_steps = ((nlat - clat) / bbox.lat_span()).round().abs();
            let lon_steps = ((nlon - clon) / bbox.lon_span()).round().abs();
            assert!(lat_steps <= 1.0 && lon_steps <= 1.0);
            assert!(lat_steps + lon_steps >= 1.0);
        }
    }

    #[test]
    fn neighbors_cover_row_and_column_seams() {
        // "u000" sits on a major base-32 seam (borders "spbpb..." row).
        for cell in ["u000", "7zzz", "ezs4", "dr5regw"] {
            let ns = neighbors(cell);
            assert_eq!(ns.len(), 8, "seam cell {cell} must have 8 neighbors");

            let bbox = decode(cell).unwrap();
            for n in &ns {
                let nb = decode(n).unwrap();
                // Adjacent boxes share an edge or a corner.
                let lat_gap = (nb.center().0 - bbox.center().0).abs();
                let lon_gap = (nb.center().1 - bbox.center().1).abs();
                assert!(lat_gap < bbox.lat_span() * 1.5);
                assert!(lon_gap < bbox.lon_span() * 1.5 || lon_gap > 360.0 - bbox.lon_span() * 1.5);
            }
        }
    }

    #[test]
    fn neighbors_wrap_at_antimeridian() {
        let cell = encode(0.0, 179.999, 3);
        let ns = neighbors(cell.as_str());
        assert_eq!(ns.len(), 8);

        // The eastern neighbors live on the far side of the date line.
        let crossed = ns
            .iter()
            .any(|n| decode(n).unwrap().lon_min <= -180.0 + 1e-9);
        assert!(crossed, "expected a neighbor across the date line");
    }

    #[test]
    fn neighbors_truncate_at_poles() {
        let cell = encode(89.99, 0.0, 3);
        let ns = neighbors(cell.as_str());
        // The northern row does not exist; 5 bounded neighbors remain.
        assert_eq!(ns.len(), 5);
        for n in &ns {
            assert!(decode(n).unwrap().lat_max <= 90.0 + 1e-9);
        }
    }

    #[test]
    fn neighborhood_covers_surrounding_disk() {
        // Points within ~1.5 cell widths of the center must land in the
        // cell itself or one of its neighbors.
        let (lat, lon) = (40.7128, -74.0060);
        let cell = encode(lat, lon, 6);
        let bbox = decode(&cell).unwrap();
        let mut covered: Vec<String> = neighbors(&cell);
        covered.push(cell.clone());

        let (clat, clon) = bbox.center();
        for i in 0..16 {
            let angle = f64::from(i) * std::f64::consts::TAU / 16.0;
            let p_lat = clat + angle.sin() * bbox.lat_span() * 0.9;
            let p_lon = clon + angle.cos() * bbox.lon_span() * 0.9;
            let p_cell = encode(p_lat, p_lon, 6);
            assert!(covered.contains(&p_cell), "{p_cell} not covered by {cell}");
        }
    }
}
