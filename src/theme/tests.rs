//! Tests for the theme engine

use super::*;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn write_template(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_embedded_templates_are_registered() {
    let engine = ThemeEngine::embedded().unwrap();

    for expected in [
        "base.html",
        "contacts.html",
        "index.html",
        "post-details.html",
        "posts-list.html",
        "partials/post_card.html",
        "partials/sidebar.html",
    ] {
        assert!(engine.has_template(expected), "missing {}", expected);
    }
}

#[test]
fn test_missing_overlay_dir_falls_back_to_embedded() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(&temp_dir.path().join("does-not-exist")).unwrap();

    assert!(engine.has_template("index.html"));
}

#[test]
fn test_overlay_replaces_embedded_template() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "contacts.html", "<p>Write to {{ site_name }}</p>");

    let engine = ThemeEngine::new(temp_dir.path()).unwrap();
    let vars = StandardTemplateVars::new("My Blog", "/contacts");
    let html = engine
        .render_with_standard_vars("contacts.html", &TeraContext::new(), &vars)
        .unwrap();

    assert_eq!(html, "<p>Write to My Blog</p>");
}

#[test]
fn test_overlay_can_extend_embedded_base() {
    let temp_dir = TempDir::new().unwrap();
    write_template(
        temp_dir.path(),
        "extra/about.html",
        r#"{% extends "base.html" %}{% block content %}<p>About us</p>{% endblock %}"#,
    );

    let engine = ThemeEngine::new(temp_dir.path()).unwrap();
    let vars = StandardTemplateVars::new("Blog", "/about");
    let html = engine
        .render_with_standard_vars("extra/about.html", &TeraContext::new(), &vars)
        .unwrap();

    assert!(html.contains("<p>About us</p>"));
    assert!(html.contains("<title>"));
}

#[test]
fn test_overlay_adds_new_template_alongside_embedded() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "about.html", "about");

    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    assert_eq!(engine.render("about.html", &TeraContext::new()).unwrap(), "about");
    assert!(engine.has_template("index.html"));
}

#[test]
fn test_invalid_overlay_template_fails_to_load() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "broken.html", "{% if %}");

    assert!(ThemeEngine::new(temp_dir.path()).is_err());
}

#[test]
fn test_render_unknown_template_is_not_found() {
    let engine = ThemeEngine::embedded().unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ThemeError>(),
        Some(ThemeError::NotFound(_))
    ));
}

#[test]
fn test_render_missing_variable_is_template_error() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "strict.html", "{{ missing.field }}");
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let err = engine.render("strict.html", &TeraContext::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ThemeError>(),
        Some(ThemeError::TemplateError(_))
    ));
}

#[test]
fn test_render_contacts_page() {
    let engine = ThemeEngine::embedded().unwrap();
    let vars = StandardTemplateVars::new("Tag Blog", "/contacts");

    let html = engine
        .render_with_standard_vars("contacts.html", &TeraContext::new(), &vars)
        .unwrap();
    assert!(html.contains("Tag Blog"));
}

#[test]
fn test_output_is_html_escaped() {
    let temp_dir = TempDir::new().unwrap();
    write_template(temp_dir.path(), "echo.html", "{{ value }}");
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let mut context = TeraContext::new();
    context.insert("value", "<script>");
    let html = engine.render("echo.html", &context).unwrap();
    assert_eq!(html, "&lt;script&gt;");
}

#[test]
fn test_simple_error_page_escapes_content() {
    let page = ThemeEngine::simple_error_page("Not Found", "No post <b>x</b>");

    assert!(page.contains("<h1>Not Found</h1>"));
    assert!(page.contains("No post &lt;b&gt;x&lt;&#x2F;b&gt;"));
}

#[test]
fn test_standard_template_vars_year() {
    let vars = StandardTemplateVars::new("Blog", "/");
    assert!(vars.year >= 2024);
}
