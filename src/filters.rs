//! Display filters available inside askama templates.

pub fn money(value: &f64) -> askama::Result<String> {
    Ok(format!("${value:.2}"))
}

pub fn stars(rating: &i64) -> askama::Result<String> {
    let clamped = (*rating).clamp(0, 5) as usize;
    Ok("★".repeat(clamped) + &"☆".repeat(5 - clamped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_renders_two_decimals() {
        assert_eq!(money(&12.5).unwrap(), "$12.50");
        assert_eq!(money(&0.0).unwrap(), "$0.00");
    }

    #[test]
    fn stars_clamp_out_of_range_ratings() {
        assert_eq!(stars(&7).unwrap(), "★★★★★");
        assert_eq!(stars(&-2).unwrap(), "☆☆☆☆☆");
        assert_eq!(stars(&3).unwrap(), "★★★☆☆");
    }
}
