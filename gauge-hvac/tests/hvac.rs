//! Behaviour of the shared HVAC registry through the public free functions

use gauge_core::dimension::{LENGTH, TIME};
use gauge_core::{DimensionVector, UnitError};
use gauge_hvac::{
    convert, format_units, fr_u, get_dimensionality, get_unit_list, registry, to_u,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn assert_close(actual: f64, expected: f64, relative: f64) {
    let tolerance = relative * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} but got {}",
        expected,
        actual
    );
}

#[test]
fn fahrenheit_celsius_round_trip() {
    init_tracing();
    for f in [-459.67, -40.0, 0.0, 32.0, 72.5, 212.0, 1000.0] {
        let c = convert(f, "°F", "°C").unwrap();
        let back = convert(c, "°C", "°F").unwrap();
        assert_close(back, f, 1e-9);
    }
    assert_close(convert(212.0, "degF", "degC").unwrap(), 100.0, 1e-9);
    assert_close(convert(-40.0, "°C", "°F").unwrap(), -40.0, 1e-9);
}

#[test]
fn base_round_trip_for_every_unit() {
    init_tracing();
    for unit in registry().unwrap().units() {
        let value = 12.5;
        let base = fr_u(value, &unit.name).unwrap();
        let back = to_u(base, &unit.name).unwrap();
        assert_close(back, value, 1e-9);
    }
}

#[test]
fn dimensionality_equalities() {
    assert_eq!(get_dimensionality("°F"), get_dimensionality("°C"));
    assert_eq!(
        get_dimensionality("kW"),
        get_dimensionality("(lb_m*inch*meter)/(minute^2*day)")
    );
    assert_ne!(get_dimensionality("F"), get_dimensionality("C"));
    assert_eq!(get_dimensionality("%"), get_dimensionality(""));
    assert_eq!(get_dimensionality("h"), get_dimensionality("s"));
    assert_eq!(get_dimensionality("ton_ref"), get_dimensionality("W"));
    assert_eq!(get_dimensionality("in_H2O"), get_dimensionality("Pa"));
    assert_eq!(get_dimensionality("lb_f"), get_dimensionality("N"));
}

#[test]
fn unknown_text_is_dimensionless() {
    assert_eq!(get_dimensionality("cubit"), DimensionVector::dimensionless());
    assert_eq!(get_dimensionality("m **"), DimensionVector::dimensionless());
}

#[test]
fn formatting() {
    let cases = [
        ("degF", "°F"),
        ("m**3/s", "m³/s"),
        ("m**1.5/s", "m¹⋅⁵/s"),
        ("m**2*K/W", "K·m²/W"),
        ("degree", "deg"),
        ("cm**3", "cm³"),
        ("inch_H2O_39F", "inch_H2O_39F"),
        ("cfm", "cfm"),
        ("m²⋅s", "m²·s"),
        ("1000*m", "1000·m"),
    ];
    for (input, expected) in cases {
        assert_eq!(format_units(input).unwrap(), expected, "formatting {}", input);
    }
}

#[test]
fn incompatible_dimensions_are_reported() {
    let err = convert(1.0, "in", "day").unwrap_err();
    assert_eq!(
        err,
        UnitError::IncompatibleDimensions {
            from: "inch".to_string(),
            from_dim: DimensionVector::base(LENGTH),
            to: "day".to_string(),
            to_dim: DimensionVector::base(TIME),
        }
    );
    let message = err.to_string();
    assert!(message.contains("inch"));
    assert!(message.contains("[length]"));
    assert!(message.contains("day"));
    assert!(message.contains("[time]"));
}

#[test]
fn undefined_unit_is_reported() {
    let err = convert(1.0, "cubit", "m").unwrap_err();
    assert_eq!(
        err,
        UnitError::UndefinedUnit {
            name: "cubit".to_string()
        }
    );
    assert!(err.to_string().contains("cubit"));
}

#[test]
fn conversions_to_and_from_si() {
    assert_close(fr_u(-40.0, "°F").unwrap(), fr_u(-40.0, "°C").unwrap(), 1e-9);
    assert_close(fr_u(32.0, "°F").unwrap(), fr_u(0.0, "°C").unwrap(), 1e-9);
    assert_close(to_u(273.15, "°C").unwrap(), 0.0, 1e-9);
    assert_close(fr_u(1.0, "in").unwrap(), 0.0254, 1e-12);
    assert_close(fr_u(3.41241633, "Btu/h").unwrap(), 1.0, 1e-4);
    assert_close(fr_u(1.0, "ton_ref").unwrap(), 3516.8528420666666, 1e-9);
    assert_close(fr_u(1.0, "in_H2O").unwrap(), 249.08193551, 1e-6);
}

#[test]
fn hvac_flow_rates() {
    assert_close(convert(1.0, "cfm", "m**3/s").unwrap(), 4.719474432e-4, 1e-9);
    assert_close(convert(1.0, "gpm", "L/min").unwrap(), 3.785411784, 1e-9);
}

#[test]
fn vectorized_temperatures() {
    let fahrenheit = vec![-40.0, 0.0, 32.0, 68.0, 98.6, 212.0];
    let kelvin = fr_u(fahrenheit.clone(), "°F").unwrap();
    assert_eq!(kelvin.len(), fahrenheit.len());
    for (k, f) in kelvin.iter().zip(&fahrenheit) {
        assert_close(*k, (f - 32.0) * 5.0 / 9.0 + 273.15, 1e-9);
    }

    let celsius = convert(&fahrenheit[..], "°F", "°C").unwrap();
    assert_close(celsius[0], -40.0, 1e-9);
    assert_close(celsius[2], 0.0, 1e-9);
    assert_close(celsius[5], 100.0, 1e-9);

    let fixed = convert([32.0, 212.0], "degF", "K").unwrap();
    assert_close(fixed[0], 273.15, 1e-9);
    assert_close(fixed[1], 373.15, 1e-9);
}

#[test]
fn unit_list_includes_hvac_dimensions() {
    let listing = get_unit_list().unwrap();

    let flow = listing.group_of("cfm").unwrap();
    assert!(flow.aliases.contains(&"[volumetric_flow_rate]".to_string()));
    assert!(flow.units.iter().any(|u| u.name == "gallons_per_minute"));

    let resistance = listing.group_of("R_IP").unwrap();
    assert_eq!(resistance.aliases, vec!["[thermal_resistance]".to_string()]);

    let json: serde_json::Value = serde_json::from_str(&listing.to_json().unwrap()).unwrap();
    assert!(json["groups"].as_array().unwrap().len() == listing.len());
}

#[test]
fn scalar_results_are_plain_numbers() -> Result<(), UnitError> {
    let kelvin = fr_u(70.0, "°F")?;
    assert_close(kelvin - 273.15, 21.111111111111111, 1e-9);
    let rankine = convert(kelvin, "K", "°R")? * 1.0;
    assert_close(rankine, 529.67, 1e-9);
    Ok(())
}

#[test]
fn extreme_exponents_are_contained() {
    init_tracing();
    assert_eq!(get_dimensionality("m**10**30"), DimensionVector::dimensionless());
    assert_eq!(
        get_dimensionality("(m**3037000500)**3037000500"),
        DimensionVector::dimensionless()
    );
    assert_eq!(
        convert(1.0, "(m**3037000500)**3037000500", "m").unwrap_err(),
        UnitError::overflow("(m ** 3037000500) ** 3037000500")
    );
    assert!(matches!(
        convert(1.0, "m**10**30", "m"),
        Err(UnitError::UnitSyntax { .. })
    ));
}

#[test]
fn zero_scale_target_is_rejected() {
    assert_eq!(
        convert(1.0, "m", "0*m").unwrap_err(),
        UnitError::DegenerateUnit {
            unit: "0*m".to_string(),
            scale: 0.0
        }
    );
    assert!(matches!(
        fr_u(1.0, "0 * cfm"),
        Err(UnitError::DegenerateUnit { .. })
    ));
}
