use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use quire_mdx::MdxCodec;
use quire_resolve::{
    error_count, ContentLayout, DiagnosticKind, FsLoader, FsVariableSource, Inclusion, Mode,
    Pipeline, ResolutionContext, VariableSource, VersionResolver,
};
use tempfile::TempDir;

/// A content tree on disk.
struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn content(&self) -> PathBuf {
        self.path("content")
    }

    /// Context for a page, built the way the builder does.
    fn context(&self, page: &Path) -> ResolutionContext {
        let layout = ContentLayout::new(self.content(), None);
        let identity = layout.identify(page).unwrap();
        let variables = FsVariableSource::new(self.content())
            .load(&identity.version)
            .unwrap();
        ResolutionContext::for_document(page, identity, Arc::new(variables))
    }
}

fn pipeline() -> Pipeline<MdxCodec, FsLoader> {
    Pipeline::default()
}

fn versioned_site() -> Site {
    let site = Site::new();
    site.write(
        "content/4.0/docs/config.json",
        r#"{ "variables": { "teleport": { "version": "4.0.1" } } }"#,
    );
    site
}

#[test]
fn parses_marker_parameters() {
    let inclusion = Inclusion::parse(
        r#"(!includes/example.mdx var1="this is a value" var2="this is also a value"!)"#,
    )
    .unwrap();

    assert_eq!(inclusion.params.get("var1"), Some("this is a value"));
    assert_eq!(inclusion.params.get("var2"), Some("this is also a value"));
}

#[test]
fn single_quotes_are_literal_inside_values_only() {
    let inclusion = Inclusion::parse(r#"(!a.mdx msg="this is a 'string'"!)"#).unwrap();

    assert_eq!(inclusion.params.get("msg"), Some("this is a 'string'"));
    assert!(Inclusion::parse(r#"(!a.mdx msg='This is a "string"'!)"#).is_err());
}

#[test]
fn resolves_pages_against_their_version_root() {
    let site = versioned_site();
    site.write(
        "content/4.0/docs/pages/includes/intro.mdx",
        "{{ product=\"Teleport\" }}\n{{ product }} (=teleport.version=) is installed.\n",
    );
    let page = site.write(
        "content/4.0/docs/pages/guide.mdx",
        "---\ntitle: Guide\n---\n\n(!docs/pages/includes/intro.mdx!)\n\nRun `tsh version`.\n",
    );
    let ctx = site.context(&page);

    let (output, diagnostics) = pipeline()
        .resolve_source(&fs::read_to_string(&page).unwrap(), &ctx)
        .unwrap();

    assert_eq!(ctx.version, "4.0");
    assert!(diagnostics.is_empty());
    assert_eq!(
        output,
        "---\ntitle: Guide\n---\n\nTeleport 4.0.1 is installed.\n\nRun `tsh version`.\n"
    );
}

#[test]
fn partial_image_points_at_partial_directory() {
    let site = Site::new();
    site.write(
        "docs/partials/headers/1.mdx",
        "![Architecture](../image.jpg)\n",
    );
    let page = site.path("docs/page/1.mdx");
    let ctx = ResolutionContext::new(&page, site.dir.path());

    let (output, _) = pipeline()
        .resolve_source("(!docs/partials/headers/1.mdx!)\n", &ctx)
        .unwrap();

    assert_eq!(output, "![Architecture](../partials/image.jpg)\n");
}

#[test]
fn relative_links_follow_including_page_depth() {
    let site = Site::new();
    site.write(
        "fixtures/includes/include-relative-link.mdx",
        "Check out our [instructions](../installation.mdx).\n\nHere is an image showing a successful installation:\n\n[Successful installation](../installation.png)\n",
    );
    let root = site.path("fixtures/includes");
    let page = "Here are instructions on installing the software:\n\n(!include-relative-link.mdx!)\n";

    for (path, prefix) in [
        ("fixtures/dir/samelevel.mdx", "../"),
        ("fixtures/dir/dir2/below.mdx", "../../"),
        ("fixtures/above.mdx", ""),
    ] {
        let ctx = ResolutionContext::new(site.path(path), &root);

        let (output, _) = pipeline().resolve_source(page, &ctx).unwrap();

        assert_eq!(
            output,
            format!(
                "Here are instructions on installing the software:\n\nCheck out our [instructions]({prefix}installation.mdx).\n\nHere is an image showing a successful installation:\n\n[Successful installation]({prefix}installation.png)\n"
            ),
            "page at {path}"
        );
    }
}

#[test]
fn rewrites_definitions_and_lowercases_anchors() {
    let site = Site::new();
    site.write(
        "fixtures/includes/includes-relative-link-def.mdx",
        "This partial has a relative link [definition].\n\n[definition]: ../installation.mdx\n",
    );
    site.write(
        "fixtures/includes/anchor-links.mdx",
        "This is a [link to an anchor](#This-Is-A-Section).\n\n## This is a section.\n\nThis is content within the section.\n",
    );
    let root = site.path("fixtures/includes");

    let (definition, _) = pipeline()
        .resolve_source(
            "(!includes-relative-link-def.mdx!)",
            &ResolutionContext::new(site.path("fixtures/definition.mdx"), &root),
        )
        .unwrap();
    let (anchors, _) = pipeline()
        .resolve_source(
            "Here is the outer page.\n\n(!anchor-links.mdx!)\n\n",
            &ResolutionContext::new(site.path("fixtures/mypage.mdx"), &root),
        )
        .unwrap();

    assert_eq!(
        definition,
        "This partial has a relative link [definition].\n\n[definition]: installation.mdx\n"
    );
    assert_eq!(
        anchors,
        "Here is the outer page.\n\nThis is a [link to an anchor](#this-is-a-section).\n\n## This is a section.\n\nThis is content within the section.\n"
    );
}

#[test]
fn unresolved_variables_are_soft_in_resolve_mode() {
    let site = versioned_site();
    let page = site.path("content/4.0/docs/pages/vars.mdx");
    let ctx = site.context(&page);
    let source = "Version (=teleport.version=), missing (=nonexistent=).\n";

    let (output, diagnostics) = pipeline().resolve_source(source, &ctx).unwrap();
    let lint = pipeline().lint_source(source, &ctx);

    assert_eq!(output, "Version 4.0.1, missing (=nonexistent=).\n");
    assert_eq!(error_count(&diagnostics), 0);
    assert_eq!(lint.len(), 1);
    assert_eq!(lint[0].message, "Non existing variable name (=nonexistent=)");
    assert_eq!(lint[0].kind, DiagnosticKind::UnresolvedVariable);
}

#[test]
fn unclosed_heredoc_does_not_stop_resolution() {
    let site = versioned_site();
    site.write(
        "content/4.0/includes/config.mdx",
        "```code\n$ cat <<EOF > teleport.yaml\nversion: v3\n```\n",
    );
    let page = site.path("content/4.0/docs/pages/heredoc.mdx");
    let ctx = site.context(&page);
    let source = "(!includes/config.mdx!)\n\nNext (=teleport.version=).\n";

    let lint = pipeline().lint_source(source, &ctx);
    let (output, diagnostics) = pipeline().resolve_source(source, &ctx).unwrap();

    assert!(lint.is_empty());
    assert_eq!(
        output,
        "```code\n$ cat <<EOF > teleport.yaml\nversion: v3\n```\n\nNext 4.0.1.\n"
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "No closing line for heredoc format");
    assert_eq!(diagnostics[0].kind, DiagnosticKind::MalformedDirective);
}

#[test]
fn lint_reports_unclosed_heredoc_in_page() {
    let site = versioned_site();
    let ctx = site.context(&site.path("content/4.0/docs/pages/heredoc.mdx"));

    let lint = pipeline().lint_source("```bash\n$ cat <<EOF\nbody\n```\n", &ctx);

    let messages: Vec<&str> = lint.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["No closing line for heredoc format"]);
}

#[test]
fn heredoc_blank_lines_survive_resolution() {
    let site = versioned_site();
    site.write(
        "content/4.0/includes/heredoc.mdx",
        "```code\n$ cat <<'EOF' > /etc/teleport.yaml\nteleport:\n\n\n  nodename: (=teleport.version=)\n\nEOF\n$ sudo teleport start\n```\n",
    );
    let ctx = site.context(&site.path("content/4.0/docs/pages/setup.mdx"));

    let (output, diagnostics) = pipeline()
        .resolve_source("(!includes/heredoc.mdx!)\n", &ctx)
        .unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(
        output,
        "```code\n$ cat <<'EOF' > /etc/teleport.yaml\nteleport:\n\n\n  nodename: 4.0.1\n\nEOF\n$ sudo teleport start\n```\n"
    );
}

#[test]
fn resolution_is_idempotent_and_lint_clean() {
    let site = versioned_site();
    site.write(
        "content/4.0/includes/steps.mdx",
        "1. Install (=teleport.version=).\n2. Run:\n\n   ```code\n   $ teleport start\n   ```\n",
    );
    let ctx = site.context(&site.path("content/4.0/docs/pages/steps.mdx"));
    let pipeline = pipeline();

    let (once, _) = pipeline
        .resolve_source("## Steps\n\n(!includes/steps.mdx!)\n", &ctx)
        .unwrap();
    let (twice, _) = pipeline.resolve_source(&once, &ctx).unwrap();

    assert_eq!(once, twice);
    assert!(pipeline.lint_source(&once, &ctx).is_empty());
}

#[test]
fn missing_partial_is_fatal_for_resolve_and_reported_by_lint() {
    let site = versioned_site();
    let page = site.path("content/4.0/docs/pages/filename.mdx");
    let ctx = site.context(&page);
    let source = "Some text (!includes/a.mdx!) inline.\n\n(!non-existing.mdx!)\n";

    let report = pipeline()
        .run(Mode::Lint, pipeline().parse(source, &ctx).unwrap(), &ctx)
        .unwrap();
    let error = pipeline()
        .resolve_source("(!non-existing.mdx!)\n", &ctx)
        .unwrap_err();

    let messages: Vec<String> = report.diagnostics.iter().map(|d| d.message.clone()).collect();
    assert_eq!(
        messages,
        vec![
            "Includes only works if they are the only content on the line".to_string(),
            format!(
                "Wrong import path non-existing.mdx in file {}.",
                page.display()
            ),
        ]
    );
    assert_eq!(error.kind(), DiagnosticKind::MissingPartial);
}

#[test]
fn markers_with_markdown_values_resolve_and_lint_clean() {
    let site = versioned_site();
    site.write("content/4.0/includes/p.mdx", "Message: {{ msg }}\n");
    let ctx = site.context(&site.path("content/4.0/docs/pages/filename.mdx"));
    let pipeline = pipeline();

    let (output, diagnostics) = pipeline
        .resolve_source("(!includes/p.mdx msg=\"a **bold** word\"!)\n", &ctx)
        .unwrap();
    let missing = pipeline.lint_source("(!includes/missing.mdx msg=\"a **bold** word\"!)\n", &ctx);

    assert_eq!(output, "Message: a **bold** word\n");
    assert!(diagnostics.is_empty());
    assert!(pipeline.lint_source(&output, &ctx).is_empty());
    assert_eq!(
        missing.iter().map(|d| d.kind).collect::<Vec<_>>(),
        vec![DiagnosticKind::MissingPartial]
    );
    assert_eq!(
        pipeline
            .resolve_source("(!includes/missing.mdx msg=\"a **bold** word\"!)\n", &ctx)
            .unwrap_err()
            .kind(),
        DiagnosticKind::MissingPartial
    );
}
