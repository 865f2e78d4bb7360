//! End-to-end tests for index generation over fixture packages.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use pyref_index::{generate, package_version, GenerateOptions, IndexArtifact, UNKNOWN_VERSION};

fn create_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

fn options(root: &Path, index: &[&str], scan: &[&str]) -> GenerateOptions {
    GenerateOptions {
        source_roots: vec![root.to_path_buf()],
        index_modules: index.iter().map(|m| m.to_string()).collect(),
        scan_modules: scan.iter().map(|m| m.to_string()).collect(),
        ..GenerateOptions::default()
    }
}

fn references(index: &IndexArtifact, path: &str) -> Vec<String> {
    index.get_references(path).map(|u| u.to_vec()).unwrap_or_default()
}

/// A small package with re-exports, methods, properties and inheritance.
fn create_shop_package(root: &Path) {
    create_file(
        root,
        "shop/__init__.py",
        "from .models import *\nfrom .service import Service\n\n__all__ = ['Item', 'Service']\n",
    );
    create_file(
        root,
        "shop/models.py",
        r#"
import typing

__all__ = ["Item", "Order"]


class Item:
    name: str
    price: float


class Order:
    items: typing.List[Item]

    @property
    def total(self) -> float: ...

    def first(self) -> typing.Optional[Item]: ...


class _Draft:
    item: Item
"#,
    );
    create_file(
        root,
        "shop/service.py",
        r#"
from __future__ import annotations

import typing

from shop import models

if typing.TYPE_CHECKING:
    from .models import Order


class Service:
    def lookup(self, name: str) -> models.Item: ...

    async def place(self) -> Order: ...


class PriorityService(Service):
    level: int
"#,
    );
}

mod generation {
    use super::*;

    #[test]
    fn test_method_reference() {
        let temp_dir = TempDir::new().unwrap();
        create_shop_package(temp_dir.path());

        let index = generate(&options(temp_dir.path(), &["shop"], &["shop"])).unwrap();

        let item_uses = references(&index, "shop.models.Item");
        assert!(item_uses.contains(&"shop.models.Order.items".to_string()));
        assert!(item_uses.contains(&"shop.models.Order.first()".to_string()));
        assert!(item_uses.contains(&"shop.service.Service.lookup()".to_string()));
        assert!(item_uses.contains(&"shop.service.PriorityService.lookup()".to_string()));
        // Private classes are never walked
        assert!(!item_uses.iter().any(|u| u.contains("_Draft")));

        assert_eq!(
            references(&index, "shop.models.Order"),
            vec![
                "shop.service.Service.place()".to_string(),
                "shop.service.PriorityService.place()".to_string(),
            ]
        );
    }

    #[test]
    fn test_property_has_no_call_suffix() {
        let temp_dir = TempDir::new().unwrap();
        create_shop_package(temp_dir.path());

        let index = generate(&options(temp_dir.path(), &["shop"], &["shop"])).unwrap();

        let float_uses = references(&index, "builtins.float");
        assert!(float_uses.contains(&"shop.models.Order.total".to_string()));
        assert!(float_uses.contains(&"shop.models.Item.price".to_string()));
    }

    #[test]
    fn test_re_exports_are_aliases() {
        let temp_dir = TempDir::new().unwrap();
        create_shop_package(temp_dir.path());

        let index = generate(&options(temp_dir.path(), &["shop"], &["shop"])).unwrap();

        assert_eq!(index.aliases().get("shop.Item").map(String::as_str), Some("shop.models.Item"));
        assert_eq!(
            index.aliases().get("shop.Service").map(String::as_str),
            Some("shop.service.Service")
        );
        assert_eq!(
            index.get_references("shop.Item"),
            index.get_references("shop.models.Item")
        );
    }

    #[test]
    fn test_two_hop_alias_collapses_to_declaration() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "");
        create_file(temp_dir.path(), "pkg/c.py", "class Foo:\n    pass\n");
        create_file(temp_dir.path(), "pkg/b.py", "from pkg.c import Foo\n");
        create_file(
            temp_dir.path(),
            "pkg/a.py",
            "from pkg.b import Foo as Bar\n\ndef make() -> Bar: ...\n",
        );

        let index = generate(&options(temp_dir.path(), &["pkg"], &["pkg"])).unwrap();

        assert_eq!(references(&index, "pkg.c.Foo"), vec!["pkg.a.make()".to_string()]);
        assert_eq!(index.aliases().get("pkg.a.Bar").map(String::as_str), Some("pkg.c.Foo"));
        assert_eq!(index.aliases().get("pkg.b.Foo").map(String::as_str), Some("pkg.c.Foo"));
        assert!(index.get_references("pkg.b.Foo").is_some());
        assert!(!index.object_paths_to_uses().contains_key("pkg.b.Foo"));
    }

    #[test]
    fn test_nested_generic_with_and_without_builtins() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "");
        create_file(
            temp_dir.path(),
            "pkg/models.py",
            "from typing import Dict, List\n\nclass Foo:\n    pass\n\nclass Holder:\n    items: Dict[str, List[Foo]]\n",
        );

        let mut opts = options(temp_dir.path(), &["pkg"], &["pkg"]);
        opts.track_builtins = false;
        let index = generate(&opts).unwrap();
        let keys: Vec<&str> = index.object_paths_to_uses().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["pkg.models.Foo"]);
        assert_eq!(references(&index, "pkg.models.Foo"), vec!["pkg.models.Holder.items".to_string()]);

        opts.track_builtins = true;
        let index = generate(&opts).unwrap();
        let keys: Vec<&str> = index.object_paths_to_uses().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["builtins.dict", "builtins.list", "builtins.str", "pkg.models.Foo"]
        );
        for key in keys {
            assert_eq!(references(&index, key), vec!["pkg.models.Holder.items".to_string()]);
        }
    }

    #[test]
    fn test_relative_import_from_parent_package() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "class Foo:\n    pass\n");
        create_file(temp_dir.path(), "pkg/sub/__init__.py", "");
        create_file(
            temp_dir.path(),
            "pkg/sub/mod.py",
            "from .. import Foo\n\ndef get() -> Foo: ...\n",
        );

        let index = generate(&options(temp_dir.path(), &["pkg"], &["pkg"])).unwrap();
        assert_eq!(references(&index, "pkg.Foo"), vec!["pkg.sub.mod.get()".to_string()]);
    }

    #[test]
    fn test_non_importable_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "");
        create_file(temp_dir.path(), "pkg/models.py", "class Foo:\n    pass\n");
        create_file(temp_dir.path(), "pkg/setup-helper.py", "class Helper:\n    foo: Foo\n");
        create_file(temp_dir.path(), "pkg/foo.bar.py", "x = 1\n");
        create_file(
            temp_dir.path(),
            "pkg/api.py",
            "from .models import Foo\n\ndef get() -> Foo: ...\n",
        );

        let index = generate(&options(temp_dir.path(), &["pkg"], &["pkg"])).unwrap();
        assert_eq!(references(&index, "pkg.models.Foo"), vec!["pkg.api.get()".to_string()]);
    }

    #[test]
    fn test_scan_module_not_found() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "");

        let result = generate(&options(temp_dir.path(), &["pkg"], &["missing"]));
        assert!(matches!(result, Err(pyref_index::IndexerError::ModuleNotFound(name)) if name == "missing"));
    }
}

mod search {
    use super::*;

    fn create_widget_package(root: &Path) {
        create_file(root, "pkg/__init__.py", "");
        create_file(root, "pkg/a.py", "class Widget:\n    pass\n");
        create_file(root, "pkg/b.py", "class GadgetWidget:\n    pass\n");
        create_file(
            root,
            "pkg/c.py",
            "from .a import Widget\nfrom .b import GadgetWidget\n\nclass Panel:\n    widget: Widget\n    gadget: GadgetWidget\n",
        );
    }

    #[test]
    fn test_search_by_trailing_name() {
        let temp_dir = TempDir::new().unwrap();
        create_widget_package(temp_dir.path());

        let index = generate(&options(temp_dir.path(), &["pkg"], &["pkg"])).unwrap();

        let (path, uses) = index.search("widget").unwrap();
        assert_eq!(path, "pkg.a.Widget");
        assert_eq!(uses, &["pkg.c.Panel.widget".to_string()]);

        let (path, uses) = index.search("gadgetwidget").unwrap();
        assert_eq!(path, "pkg.b.GadgetWidget");
        assert_eq!(uses, &["pkg.c.Panel.gadget".to_string()]);

        assert!(index.search("gadget").is_none());
    }

    #[test]
    fn test_search_by_dotted_suffix() {
        let temp_dir = TempDir::new().unwrap();
        create_widget_package(temp_dir.path());

        let index = generate(&options(temp_dir.path(), &["pkg"], &["pkg"])).unwrap();

        let (path, _) = index.search("a.Widget").unwrap();
        assert_eq!(path, "pkg.a.Widget");
        assert!(index.search("b.Widget").is_none());
    }
}

mod persistence {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        create_shop_package(temp_dir.path());

        let mut opts = options(temp_dir.path(), &["shop"], &["shop"]);
        opts.package_version = Some("1.2.3".to_string());
        let index = generate(&opts).unwrap();

        let out = temp_dir.path().join("out/shop_index.json");
        index.save(&out).unwrap();

        let loaded = IndexArtifact::load(&out).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.version(), "1.2.3");
        assert_eq!(loaded.search("item"), index.search("item"));
    }

    #[test]
    fn test_generation_is_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        create_shop_package(temp_dir.path());

        let opts = options(temp_dir.path(), &["shop"], &["shop"]);
        let first = temp_dir.path().join("first.json");
        let second = temp_dir.path().join("second.json");
        generate(&opts).unwrap().save(&first).unwrap();
        generate(&opts).unwrap().save(&second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_version_from_installed_distribution() {
        let temp_dir = TempDir::new().unwrap();
        create_shop_package(temp_dir.path());
        create_file(
            temp_dir.path(),
            "shop-0.4.0.dist-info/METADATA",
            "Metadata-Version: 2.1\nName: shop\nVersion: 0.4.0\n",
        );

        let roots = vec![temp_dir.path().to_path_buf()];
        let mut opts = options(temp_dir.path(), &["shop"], &["shop"]);
        opts.package_version = package_version(&roots, "Shop");
        assert_eq!(generate(&opts).unwrap().version(), "0.4.0");

        opts.package_version = package_version(&roots, "missing");
        assert_eq!(generate(&opts).unwrap().version(), UNKNOWN_VERSION);
    }
}
