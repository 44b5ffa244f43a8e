//! Front matter rendering and title heading removal.

use crate::models::FrontMatter;

/// Layout tag written into every front matter block.
pub const DEFAULT_LAYOUT: &str = "post";

/// Render a YAML front matter block, including both `---` fences.
///
/// ```text
/// ---
/// layout: post
/// title: 'My Post'
/// description: 'desc'
/// image: '/images/hero.png'
/// date: '2021-05-04T00:00:00Z'
/// ---
/// ```
pub fn render_front_matter(front_matter: &FrontMatter) -> String {
    let image = front_matter
        .image
        .as_deref()
        .map(|image| format!("image: {}\n", yaml_quote(image)))
        .unwrap_or_default();
    format!(
        "---\nlayout: {}\ntitle: {}\ndescription: {}\n{image}date: {}\n---\n",
        front_matter.layout,
        yaml_quote(&front_matter.title),
        yaml_quote(&front_matter.description),
        yaml_quote(&front_matter.date),
    )
}

/// Single-quoted YAML scalar. Quotes are doubled and line breaks folded.
fn yaml_quote(value: &str) -> String {
    let folded = value.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("'{}'", folded.replace('\'', "''"))
}

/// Remove the first top-level heading, ATX (`# Title`) or setext
/// (`Title` underlined with `=`), along with the blank lines after it.
///
/// Returns the input unchanged when there is no such heading.
pub fn strip_title_heading(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();

    let heading = lines.iter().enumerate().find_map(|(i, line)| {
        if is_atx_h1(line) {
            return Some((i, 1));
        }
        let next = lines.get(i + 1)?;
        (!line.trim().is_empty() && is_setext_h1_underline(next)).then_some((i, 2))
    });

    let Some((start, len)) = heading else {
        return markdown.to_string();
    };

    let mut end = start + len;
    while lines.get(end).is_some_and(|l| l.trim().is_empty()) {
        end += 1;
    }

    let mut kept: Vec<&str> = lines[..start].to_vec();
    kept.extend_from_slice(&lines[end..]);
    let mut out = kept.join("\n");
    if markdown.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

fn is_atx_h1(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed == "#" || trimmed.starts_with("# ")
}

fn is_setext_h1_underline(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '=')
}
