/// SRID used when neither the class nor the dataset declares a CRS.
pub const DEFAULT_SRID: i32 = 28992;

/// Extract the numeric SRID from a CRS code.
///
/// Accepts `EPSG:4326`, `urn:ogc:def:crs:EPSG::4326` and bare `4326`.
pub fn parse_srid(code: &str) -> Option<i32> {
    code.rsplit(':')
        .next()
        .and_then(|digits| digits.trim().parse::<i32>().ok())
        .filter(|srid| *srid > 0)
}

/// Resolve the SRID for a class: class CRS, then dataset CRS, then the fallback.
pub fn resolve_srid(class_crs: Option<&str>, dataset_crs: Option<&str>, fallback: i32) -> i32 {
    class_crs
        .and_then(parse_srid)
        .or_else(|| dataset_crs.and_then(parse_srid))
        .unwrap_or(fallback)
}
