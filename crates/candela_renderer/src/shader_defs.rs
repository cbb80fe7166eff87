//! WGSL constant injection. Shader sources carry `{{name}}` markers that are
//! replaced with concrete values from `RenderSettings` when the pipeline is
//! created. Every marker must resolve; an unknown name is a hard error.

use crate::error::ShaderDefError;

/// Concatenates the given chunks and substitutes all `{{name}}` markers.
pub fn compose(chunks: &[&str], defs: &[(&str, String)]) -> Result<String, ShaderDefError> {
    let mut source = String::new();
    for chunk in chunks {
        source.push_str(chunk);
        source.push('\n');
    }
    substitute(&source, defs)
}

fn substitute(source: &str, defs: &[(&str, String)]) -> Result<String, ShaderDefError> {
    let mut output = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(ShaderDefError::Unterminated)?;
        let name = after[..end].trim();

        let value = defs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ShaderDefError::UnknownConstant {
                name: name.to_string(),
            })?;

        output.push_str(value);
        rest = &after[end + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<(&'static str, String)> {
        vec![
            ("grid_x", "16".to_string()),
            ("light_radius", "2.0".to_string()),
        ]
    }

    #[test]
    fn substitutes_markers() {
        let source = "const N: u32 = {{grid_x}}u;\nconst R: f32 = {{ light_radius }};";
        let composed = substitute(source, &defs()).expect("valid markers");
        assert_eq!(composed, "const N: u32 = 16u;\nconst R: f32 = 2.0;");
    }

    #[test]
    fn unknown_constant_is_an_error() {
        let result = substitute("let x = {{missing}};", &defs());
        assert_eq!(
            result,
            Err(ShaderDefError::UnknownConstant {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn unterminated_marker_is_an_error() {
        let result = substitute("let x = {{grid_x;", &defs());
        assert_eq!(result, Err(ShaderDefError::Unterminated));
    }

    #[test]
    fn compose_joins_chunks_with_newlines() {
        let composed = compose(&["const A = {{grid_x}}u;", "const B = 1u;"], &defs())
            .expect("valid chunks");
        assert!(composed.contains("const A = 16u;\n"));
        assert!(composed.contains("const B = 1u;"));
    }
}
