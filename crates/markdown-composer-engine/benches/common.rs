// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "## Section\n\nParagraph with **bold**, *italic* and `code` plus a [link](https://example.com).\n\n- Bullet point\n  - Nested item #tag\n- Another [[keyword]]\n\n1. First\n2. Second\n\n> Quoted line\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_nested_list(items: usize, depth: usize) -> String {
    let mut content = String::new();
    for i in 0..items {
        for level in 0..depth {
            let indent = "  ".repeat(level);
            content.push_str(&format!("{indent}- Item {i} at level {level}\n"));
        }
    }
    content
}
