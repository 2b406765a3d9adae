//! List command - prints the distribution catalog.

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::Result;

/// Execute the list command.
pub fn cmd_list(config: &Config) -> Result<()> {
    let catalog = Catalog::load(&config.catalog)?;
    print!("{}", render_catalog(&catalog));
    Ok(())
}

/// One line per distribution, variants indented below their parent.
pub fn render_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    for dist in catalog.distributions() {
        let archs: Vec<&str> = dist.architectures.keys().map(String::as_str).collect();
        out.push_str(&format!(
            "{:<16} [{}] {} package(s), {} pre / {} post hook(s)\n",
            dist.name,
            archs.join(", "),
            dist.packages.len(),
            dist.pre.len(),
            dist.post.len()
        ));
        for variant in &dist.variants {
            out.push_str(&format!(
                "  {:<14} +{} package(s)\n",
                variant.name,
                variant.packages.len()
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_catalog() {
        let catalog = Catalog::from_json(
            r#"[{
                "name": "arch",
                "packages": ["base", "vim"],
                "buildarch": {"aarch64": ["http://mirror/arch.tar.gz"]},
                "variants": [{"name": "arch-kde", "packages": ["plasma"]}]
            }]"#,
        )
        .unwrap();
        let text = render_catalog(&catalog);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("arch"));
        assert!(lines[0].contains("[aarch64] 2 package(s)"));
        assert!(lines[1].trim_start().starts_with("arch-kde"));
    }
}
