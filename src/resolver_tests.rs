#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    use crate::config::BuildConfig;
    use crate::error::BuildError;
    use crate::resolver::{resolve_graph, ModuleGraph};
    use crate::vfs::Snapshot;

    fn resolve(files: &[(&str, &str)]) -> Result<ModuleGraph, BuildError> {
        let snapshot = Snapshot::from_files(files.iter().copied()).unwrap();
        resolve_graph(&snapshot, "/App.jsx", &BuildConfig::default())
    }

    fn decode(url: &str) -> String {
        let encoded = url
            .strip_prefix("data:text/javascript;base64,")
            .expect("module url should be a base64 data url");
        String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap()
    }

    fn paths(graph: &ModuleGraph) -> Vec<&str> {
        graph
            .modules
            .iter()
            .map(|m| m.original_path.as_str())
            .collect()
    }

    #[test]
    fn test_cyclic_imports_terminate() {
        let graph = resolve(&[
            (
                "/App.jsx",
                "import { b } from './B';\nexport const a = 1;\nexport default function App() { return <p>{b}</p>; }",
            ),
            ("/B.jsx", "import { a } from './App';\nexport const b = () => a;"),
        ])
        .unwrap();
        assert_eq!(paths(&graph), vec!["/App.jsx", "/B.jsx"]);

        let b = graph.module("/B.jsx").unwrap();
        assert!(b.transformed_code.contains("\"@/App.jsx\""));
        assert!(graph.import_map.contains("@/App.jsx"));
        assert!(graph.import_map.contains("@/B.jsx"));
    }

    #[test]
    fn test_missing_alias_gets_placeholder() {
        let graph = resolve(&[(
            "/App.jsx",
            "import Missing, { Icon } from '@/components/Missing';\nexport default function App() { return <Missing><Icon /></Missing>; }",
        )])
        .unwrap();

        let url = graph.import_map.get("@/components/Missing").unwrap();
        assert!(url.starts_with("data:"));
        let placeholder = decode(url);
        assert!(placeholder.contains("export default Placeholder"));
        assert!(placeholder.contains("Placeholder as Icon"));

        assert_eq!(graph.unresolved.len(), 1);
        assert_eq!(graph.unresolved[0].importer, "/App.jsx");
        assert_eq!(graph.unresolved[0].specifier, "@/components/Missing");
        assert_eq!(paths(&graph), vec!["/App.jsx"]);
    }

    #[test]
    fn test_local_specifiers_are_rewritten() {
        let graph = resolve(&[
            (
                "/App.jsx",
                "import Button from './components/Button';\nimport { cn } from '@/lib/utils';\nexport default function App() { return <Button className={cn('a')} />; }",
            ),
            (
                "/components/Button.tsx",
                "export default function Button(props: { className?: string }) {\n\
                 return <button {...props} />;\n}",
            ),
            ("/lib/utils.ts", "export const cn = (...c: string[]): string => c.join(' ');"),
        ])
        .unwrap();
        assert_eq!(
            paths(&graph),
            vec!["/App.jsx", "/components/Button.tsx", "/lib/utils.ts"]
        );

        let app = graph.module("/App.jsx").unwrap();
        assert!(app.transformed_code.contains("\"@/components/Button.tsx\""));
        assert!(app.transformed_code.contains("\"@/lib/utils.ts\""));
        assert!(!app.transformed_code.contains("'./components/Button'"));

        let button = graph.module("/components/Button.tsx").unwrap();
        assert_eq!(
            app.import_specifier_rewrites.get("./components/Button"),
            Some(&button.url)
        );
        assert_eq!(graph.import_map.get("@/components/Button.tsx"), Some(button.url.as_str()));
        // The alias as written resolves as well.
        assert!(graph.import_map.contains("@/lib/utils"));
        assert!(decode(&button.url).contains("//# sourceURL=/components/Button.tsx"));
    }

    #[test]
    fn test_packages_map_to_cdn() {
        let graph = resolve(&[(
            "/App.jsx",
            "import { useState } from 'react';\nimport { Heart } from 'lucide-react';\nimport 'katex/dist/katex.min.css';\nexport default function App() { const [s] = useState(0); return <Heart size={s} />; }",
        )])
        .unwrap();
        assert_eq!(graph.import_map.get("react"), Some("https://esm.sh/react@19"));
        assert_eq!(
            graph.import_map.get("lucide-react"),
            Some("https://esm.sh/lucide-react?external=react,react-dom")
        );
        assert_eq!(
            graph.external_stylesheets,
            vec!["https://esm.sh/katex/dist/katex.min.css".to_string()]
        );
        let app = graph.module("/App.jsx").unwrap();
        assert!(!app.transformed_code.contains("katex"));
        assert!(graph.unresolved.is_empty());
    }

    #[test]
    fn test_css_is_collected_and_removed() {
        let graph = resolve(&[
            (
                "/App.jsx",
                "import Button from './Button';\nimport './app.css';\nexport default function App() { return <Button />; }",
            ),
            (
                "/Button.jsx",
                "import styles from './button.module.css';\nimport './button.css';\nexport default function Button() { return <button className={styles.primary} />; }",
            ),
            ("/app.css", "body { margin: 0; }"),
            ("/button.css", ".btn { color: red; }"),
            ("/button.module.css", ".primary { color: blue; }"),
        ])
        .unwrap();

        let order: Vec<&str> = graph.stylesheets.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(order, vec!["/button.module.css", "/button.css", "/app.css"]);
        assert_eq!(graph.stylesheets[2].content, "body { margin: 0; }");

        let app = graph.module("/App.jsx").unwrap();
        assert!(!app.transformed_code.contains("app.css"));
        assert_eq!(app.css_dependencies, vec!["/app.css".to_string()]);

        let button = graph.module("/Button.jsx").unwrap();
        assert!(button.transformed_code.contains("const styles = new Proxy"));
        assert!(!button.transformed_code.contains(".css"));
    }

    #[test]
    fn test_stylesheet_reexports_keep_their_names() {
        let graph = resolve(&[
            (
                "/App.jsx",
                "import { card } from './theme';\n\
                 export default function App() { return <div className={card} />; }",
            ),
            (
                "/theme.js",
                "export { card } from './theme.css';\nexport const accent = 'blue';",
            ),
            ("/theme.css", ".card { padding: 1rem; }"),
        ])
        .unwrap();

        let theme = graph.module("/theme.js").unwrap();
        assert!(theme.transformed_code.contains("export const card = \"card\";"));
        assert!(!theme.transformed_code.contains("theme.css"));
        assert_eq!(theme.css_dependencies, vec!["/theme.css".to_string()]);
        assert_eq!(graph.stylesheets[0].path, "/theme.css");
    }

    #[test]
    fn test_type_only_imports_are_not_followed() {
        let snapshot = Snapshot::from_files([
            (
                "/App.tsx",
                "import type { Props } from './types';\nexport default function App(p: Props) { return <div>{p.title}</div>; }",
            ),
            ("/types.ts", "export interface Props { title: string }"),
        ])
        .unwrap();
        let graph = resolve_graph(&snapshot, "/App.tsx", &BuildConfig::default()).unwrap();
        assert_eq!(paths(&graph), vec!["/App.tsx"]);
    }

    #[test]
    fn test_dynamic_import_of_unvisited_module_uses_placeholder() {
        let graph = resolve(&[
            (
                "/App.jsx",
                "import { lazy } from 'react';\nconst Lazy = lazy(() => import('./Lazy'));\nexport default function App() { return <Lazy />; }",
            ),
            ("/Lazy.jsx", "export default function Lazy() { return <p>lazy</p>; }"),
        ])
        .unwrap();
        assert_eq!(paths(&graph), vec!["/App.jsx"]);
        let url = graph.import_map.get("@/Lazy.jsx").unwrap();
        assert!(decode(url).contains("Placeholder"));
    }

    #[test]
    fn test_unsupported_scheme_and_json() {
        let graph = resolve(&[
            (
                "/App.jsx",
                "import fs from 'node:fs';\nimport data from './data.json';\nexport default function App() { return <p>{data.title}{String(fs)}</p>; }",
            ),
            ("/data.json", "{ \"title\": \"Hello\" }"),
        ])
        .unwrap();
        assert!(graph.import_map.get("@unresolved/node:fs").is_some());
        let data = graph.module("/data.json").unwrap();
        assert!(data.transformed_code.starts_with("export default {\"title\":\"Hello\"};"));
    }

    #[test]
    fn test_first_syntax_error_in_discovery_order_wins() {
        let err = resolve(&[
            (
                "/App.jsx",
                "import A from './A';\nimport B from './B';\nexport default function App() { return <div><A /><B /></div>; }",
            ),
            ("/A.jsx", "export default function A() { return <span>; }"),
            ("/B.jsx", "export default function B() { return <p>; }"),
        ])
        .unwrap_err();
        match err {
            BuildError::SyntaxError(err) => assert_eq!(err.path, "/A.jsx"),
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }
}
