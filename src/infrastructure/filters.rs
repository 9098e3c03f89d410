//! Type-name filters available inside templates.
//!
//! Type names follow the `INT32_t` / `INT32_T` convention: a base name, an
//! underscore and a one letter suffix (`t` for the type, `T` for its enum).

use minijinja::{Error, ErrorKind};

/// `INT32_t` -> `INT32_T`
pub fn type2enum(type_name: String) -> String {
    let mut chars = type_name.chars();
    match chars.next_back() {
        Some(last) => {
            let mut enum_name: String = chars.collect();
            enum_name.extend(last.to_uppercase());
            enum_name
        }
        None => type_name,
    }
}

/// `INT32_T` -> `npy_int32`
pub fn type_to_numpy_c_type(enum_type: String) -> String {
    format!("npy_{}", strip_type_suffix(&enum_type.to_lowercase()))
}

/// `INT32_T` -> `int32`
pub fn type_to_numpy_type(enum_type: String) -> String {
    strip_type_suffix(&enum_type.to_lowercase()).to_string()
}

/// `FLOAT64_T` -> `NPY_FLOAT64`
pub fn type_to_numpy_enum_type(enum_type: String) -> String {
    format!("NPY_{}", strip_type_suffix(&enum_type.to_uppercase()))
}

/// Best real type to accumulate a sum of `type_name` values.
pub fn type_to_real_sum_type(type_name: String) -> Result<String, Error> {
    let real = match type_name.as_str() {
        "INT32_t" | "UINT32_t" | "INT64_t" | "UINT64_t" => "FLOAT64_t",
        "FLOAT32_t" | "FLOAT64_t" => "FLOAT64_t",
        "FLOAT128_t" => "FLOAT128_t",
        "COMPLEX64_t" | "COMPLEX128_t" => "FLOAT64_t",
        "COMPLEX256_t" => "FLOAT128_t",
        _ => return Err(unknown_type("type", &type_name)),
    };
    Ok(real.to_string())
}

/// Real type of the parts of a complex type: `COMPLEX128_t` -> `FLOAT64_t`.
pub fn real_type_from_complex_type(type_name: String) -> Result<String, Error> {
    let real = match type_name.as_str() {
        "COMPLEX64_t" => "FLOAT32_t",
        "COMPLEX128_t" => "FLOAT64_t",
        "COMPLEX256_t" => "FLOAT128_t",
        _ => return Err(unknown_type("complex type", &type_name)),
    };
    Ok(real.to_string())
}

/// Drop the trailing `_t` / `_T`; names too short to carry one become empty.
fn strip_type_suffix(name: &str) -> &str {
    match name.char_indices().rev().nth(1) {
        Some((idx, _)) => &name[..idx],
        None => "",
    }
}

fn unknown_type(kind: &str, name: &str) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("not a recognized {kind}: {name}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_transformations() {
        assert_eq!(type2enum("INT32_t".into()), "INT32_T");
        assert_eq!(type_to_numpy_c_type("INT32_T".into()), "npy_int32");
        assert_eq!(type_to_numpy_type("INT32_T".into()), "int32");
        assert_eq!(type_to_numpy_enum_type("FLOAT64_T".into()), "NPY_FLOAT64");
    }

    #[test]
    fn test_short_names_do_not_panic() {
        assert_eq!(type2enum(String::new()), "");
        assert_eq!(type_to_numpy_type("T".into()), "");
    }

    #[test]
    fn test_real_sum_type() {
        assert_eq!(type_to_real_sum_type("UINT64_t".into()).unwrap(), "FLOAT64_t");
        assert_eq!(type_to_real_sum_type("COMPLEX256_t".into()).unwrap(), "FLOAT128_t");
        assert!(type_to_real_sum_type("BOOL_t".into()).is_err());
    }

    #[test]
    fn test_real_type_from_complex_type() {
        assert_eq!(
            real_type_from_complex_type("COMPLEX128_t".into()).unwrap(),
            "FLOAT64_t"
        );
        assert!(real_type_from_complex_type("FLOAT64_t".into()).is_err());
    }
}
