pub mod config;
pub mod crop;
pub mod simulate;

/// Parse `WxH` (e.g. `1920x1080`).
pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{value}'"))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

/// Parse `CX,CY` (e.g. `0.25,0.5`).
pub fn parse_center(value: &str) -> Result<(f64, f64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected CX,CY, got '{value}'"))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad cx: {e}"))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad cy: {e}"))?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes_and_centers() {
        assert_eq!(parse_size("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_size("640X480"), Ok((640, 480)));
        assert!(parse_size("1920").is_err());
        assert_eq!(parse_center("0.25, 0.5"), Ok((0.25, 0.5)));
        assert!(parse_center("half").is_err());
    }
}
