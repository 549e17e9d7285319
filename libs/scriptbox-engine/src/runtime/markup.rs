use scriptbox_common::ExecutionResult;

pub const PREVIEW_NOTE: &str = "HTML is not executed here; open the preview to see it rendered.";

/// Markup is echoed back for the preview pane, never run
pub fn render(code: &str) -> ExecutionResult {
    ExecutionResult::ok(vec![PREVIEW_NOTE.to_string(), code.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_is_returned_verbatim() {
        let code = "<h1>Hi</h1>\n<p>  spaced  </p>";
        let result = render(code);
        assert_eq!(result.error, None);
        assert_eq!(result.output_lines, vec![PREVIEW_NOTE.to_string(), code.to_string()]);
    }
}
