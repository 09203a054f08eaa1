#![no_main]

use libfuzzer_sys::fuzz_target;
use quantype::{Unit, UnitManager};

const NAMES: &[&str] = &["m", "s", "kg", "km", "inch", "mile", "hour", "N", "J", "l", "percent"];

fuzz_target!(|data: &[u8]| {
    let units = UnitManager::with_builtin_units();
    let mut left = Unit::scalar();
    let mut right = Unit::scalar();
    for pair in data.chunks(2) {
        let name = NAMES[pair[0] as usize % NAMES.len()];
        // reaches past the exponent limit within a few steps
        let power = pair.get(1).map_or(1, |p| (*p as i8) as i32 * 8);
        let Ok(single) = units.get_unit(name) else {
            return;
        };
        let Ok(raised) = single.raised_to(power) else {
            continue;
        };
        if pair[0] % 2 == 0 {
            let Ok(next) = left.times(&raised) else {
                break;
            };
            left = next;
        } else {
            let Ok(next) = right.divide(&raised) else {
                break;
            };
            right = next;
        }
    }
    if let Ok(product) = left.times(&right) {
        let _ = units.canonicalise(&product);
    }
    let _ = units.convert_factor(&left, &right);
    let _ = units.convert_factor_decimal(&left, &right);
});
