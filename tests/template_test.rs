use blueprint_forge::template::{Template, TemplateError, render, render_with_depth};
use serde_json::json;

#[test]
fn test_interpolation() {
    let out = render("Hello, {{name}}! v{{meta.version}}", &json!({ "name": "forge", "meta": { "version": 2 } }))
        .expect("render");
    assert_eq!(out, "Hello, forge! v2");
}

#[test]
fn test_missing_value_renders_empty() {
    let out = render("[{{nothing.here}}]", &json!({})).expect("render");
    assert_eq!(out, "[]");
}

#[test]
fn test_if_else_and_unless() {
    let template = "{{#if burnable}}burn{{else}}keep{{/if}}/{{#unless mintable}}fixed{{/unless}}";
    assert_eq!(
        render(template, &json!({ "burnable": true, "mintable": false })).expect("render"),
        "burn/fixed"
    );
    assert_eq!(
        render(template, &json!({ "burnable": false, "mintable": true })).expect("render"),
        "keep/"
    );
}

#[test]
fn test_truthiness_of_empty_values() {
    let template = "{{#if list}}a{{/if}}{{#if text}}b{{/if}}{{#if zero}}c{{/if}}{{#if obj}}d{{/if}}";
    let out = render(template, &json!({ "list": [], "text": "", "zero": 0, "obj": {} })).expect("render");
    assert_eq!(out, "");
}

#[test]
fn test_each_with_loop_variables() {
    let template = "{{#each items}}{{@index}}:{{name}}@{{../project}}{{#unless @last}}, {{/unless}}{{/each}}";
    let ctx = json!({ "project": "demo", "items": [{ "name": "a" }, { "name": "b" }, { "name": "c" }] });
    assert_eq!(render(template, &ctx).expect("render"), "0:a@demo, 1:b@demo, 2:c@demo");
}

#[test]
fn test_each_over_scalars_uses_this() {
    let out = render("{{#each chains}}<{{this}}>{{#if @first}}!{{/if}}{{/each}}", &json!({ "chains": ["x", "y"] }))
        .expect("render");
    assert_eq!(out, "<x>!<y>");
}

#[test]
fn test_each_else_on_empty_list() {
    let out = render("{{#each items}}{{this}}{{else}}none{{/each}}", &json!({ "items": [] })).expect("render");
    assert_eq!(out, "none");
}

#[test]
fn test_expression_conditions() {
    let template = "{{#if decimals != 18}}custom{{else}}default{{/if}} {{#if framework == \"vite\"}}vite{{/if}}";
    assert_eq!(
        render(template, &json!({ "decimals": 6, "framework": "vite" })).expect("render"),
        "custom vite"
    );
    assert_eq!(
        render(template, &json!({ "decimals": 18, "framework": "nextjs" })).expect("render"),
        "default "
    );
}

#[test]
fn test_standalone_block_lines_leave_no_blank_lines() {
    let template = "start\n{{#if on}}\nmiddle\n{{/if}}\nend\n";
    assert_eq!(render(template, &json!({ "on": true })).expect("render"), "start\nmiddle\nend\n");
    assert_eq!(render(template, &json!({ "on": false })).expect("render"), "start\nend\n");
}

#[test]
fn test_comments_are_dropped() {
    let out = render("a{{! ignored }}b", &json!({})).expect("render");
    assert_eq!(out, "ab");
}

#[test]
fn test_nesting_beyond_bound_fails() {
    let template = "{{#if a}}{{#if a}}{{#if a}}deep{{/if}}{{/if}}{{/if}}";
    let ctx = json!({ "a": true });

    assert_eq!(render_with_depth(template, &ctx, 3).expect("within bound"), "deep");
    assert_eq!(render_with_depth(template, &ctx, 2), Err(TemplateError::DepthExceeded(2)));
}

#[test]
fn test_malformed_templates() {
    let ctx = json!({});
    assert_eq!(render("{{#if a}}x", &ctx), Err(TemplateError::UnclosedBlock("if".to_string())));
    assert_eq!(
        render("{{#if a}}x{{/each}}", &ctx),
        Err(TemplateError::MismatchedClose {
            expected: "if".to_string(),
            found: "each".to_string()
        })
    );
    assert_eq!(render("x{{/if}}", &ctx), Err(TemplateError::UnexpectedClose("if".to_string())));
    assert_eq!(render("{{else}}", &ctx), Err(TemplateError::UnexpectedElse));
    assert_eq!(render("{{#with a}}{{/with}}", &ctx), Err(TemplateError::UnknownHelper("with".to_string())));
    assert!(matches!(render("{{name", &ctx), Err(TemplateError::UnterminatedTag(_))));
}

#[test]
fn test_parsed_template_renders_repeatedly() {
    let template = Template::parse("{{greeting}}").expect("parse");
    assert_eq!(template.render(&json!({ "greeting": "hi" })).expect("render"), "hi");
    assert_eq!(template.render(&json!({ "greeting": "yo" })).expect("render"), "yo");
}
