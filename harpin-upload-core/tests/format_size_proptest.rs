use harpin_upload_core::validate::format_file_size;
use proptest::prelude::*;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

fn split(formatted: &str) -> (f64, usize) {
    let (value, unit) = formatted.split_once(' ').expect("value and unit");
    let rank = UNITS
        .iter()
        .position(|u| *u == unit)
        .unwrap_or_else(|| panic!("unexpected unit in {formatted}"));
    (value.parse().expect("numeric value"), rank)
}

proptest! {
    #[test]
    fn unit_matches_repeated_division(size in any::<u64>()) {
        let (value, rank) = split(&format_file_size(size));
        let expected = size as f64 / 1024f64.powi(rank as i32);
        prop_assert!((value - expected).abs() <= 0.005 + expected * 1e-12);
        if rank < 4 {
            prop_assert!(expected < 1024.0);
        }
        if rank > 0 {
            prop_assert!(expected >= 1.0);
        }
    }

    #[test]
    fn unit_never_shrinks_as_size_grows(a in any::<u64>(), b in any::<u64>()) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let (_, small_rank) = split(&format_file_size(small));
        let (_, large_rank) = split(&format_file_size(large));
        prop_assert!(small_rank <= large_rank);
    }
}
