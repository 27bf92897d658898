//! Asset path update for pages copied into the output directory.
//!
//! A resolved page is written somewhere other than its source, so relative
//! references to images, downloads and other local files would break. They
//! are re-pointed at the files next to the source page.

use std::path::Path;

use quire_mdx::{AttrValue, Node, Root};
use quire_resolve::rewrite_asset_reference;

/// Component attributes that hold a file reference.
const ASSET_ATTRIBUTES: [&str; 4] = ["src", "href", "poster", "value"];

/// Rewrite every asset reference in `root`, returning how many changed.
pub fn update_asset_paths(root: &mut Root, source_doc: &Path, output_doc: &Path) -> usize {
    let mut changed = 0;
    let mut rewrite = |url: &mut String| {
        let updated = rewrite_asset_reference(url, source_doc, output_doc);
        if updated != *url {
            *url = updated;
            changed += 1;
        }
    };

    root.walk_mut(&mut |node| match node {
        Node::Link { url, kind, .. } | Node::Image { url, kind, .. } if kind.is_inline() => {
            rewrite(url)
        }
        Node::Definition { url, .. } => rewrite(url),
        Node::Component(component) => {
            for attribute in &mut component.attributes {
                if let AttrValue::Literal(value) = &mut attribute.value {
                    if ASSET_ATTRIBUTES.contains(&attribute.name.as_str()) {
                        rewrite(value);
                    }
                }
            }
        }
        _ => {}
    });

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_mdx::{DocumentCodec, MdxCodec};

    const SOURCE: &str = "content/4.0/docs/pages/guides/setup.mdx";
    const OUTPUT: &str = "build/4.0/guides/setup.mdx";

    fn update(source: &str) -> (String, usize) {
        let codec = MdxCodec::new();
        let mut root = codec.parse(source).unwrap();
        let changed = update_asset_paths(&mut root, Path::new(SOURCE), Path::new(OUTPUT));
        (codec.serialize(&root), changed)
    }

    #[test]
    fn repoints_images_and_links_to_files() {
        let (output, changed) =
            update("![Diagram](../img/arch.png)\n\nGet the [archive](./files/app.tar.gz).\n");

        assert_eq!(changed, 2);
        assert_eq!(
            output,
            "![Diagram](../../../content/4.0/docs/pages/img/arch.png)\n\nGet the [archive](../../../content/4.0/docs/pages/guides/files/app.tar.gz).\n"
        );
    }

    #[test]
    fn keeps_page_links_and_lowercases_anchors() {
        let (output, changed) =
            update("See [install](../installation.mdx#Linux-Install) and [top](#Overview).\n");

        assert_eq!(changed, 2);
        assert_eq!(
            output,
            "See [install](../installation.mdx#linux-install) and [top](#overview).\n"
        );
    }

    #[test]
    fn leaves_external_and_absolute_references() {
        let source = "[site](https://goteleport.com/Docs#Top) and ![logo](/static/logo.svg)\n";

        let (output, changed) = update(source);

        assert_eq!(changed, 0);
        assert_eq!(output, source);
    }

    #[test]
    fn updates_component_attributes_and_definitions() {
        let (output, changed) = update(
            "<Figure src=\"./diagram.svg\" caption=\"./not-a-path.svg\" />\n\n[guide]: ./files/guide.pdf\n",
        );

        assert_eq!(changed, 2);
        assert!(output.contains("src=\"../../../content/4.0/docs/pages/guides/diagram.svg\""));
        assert!(output.contains("caption=\"./not-a-path.svg\""));
        assert!(output.contains("[guide]: ../../../content/4.0/docs/pages/guides/files/guide.pdf"));
    }
}
