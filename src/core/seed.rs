use super::note::{Note, mint_id};

const WELCOME_TITLE: &str = "Welcome";
const WELCOME: &str = "# Welcome to Notebook

- Keep as many **Markdown** notes as you like
- Write in the editor, read the _preview_ next to it
- Everything is stored **locally**, nothing leaves this machine

Open the **Markdown Showcase** note next.";

const SHOWCASE_TITLE: &str = "Markdown Showcase";
const SHOWCASE: &str = "# Markdown Showcase

A tour of the formatting the preview understands.
Edit anything here to see the output change.

---

## Headings

# H1
## H2
### H3
#### H4
##### H5
###### H6

---

## Emphasis

**Bold**
*Italic*
***Bold and italic***
~~Strikethrough~~
<ins>Underlined</ins>

---

## Lists

- Apples
  - Green
  - Red
- Pears

1. First
2. Second
   1. Second, part one

---

## Links and images

- [The Rust Programming Language](https://doc.rust-lang.org/book/)
- [Jump to code](#code)

![Ferris](https://rustacean.net/assets/rustacean-flat-happy.png)

---

## Quotes

> Plain text is the most durable format there is.
> Write it down.

---

## Code

Call `render()` on any text.

```rust
fn main() {
    println!(\"hello, notebook\");
}
```

---

## Tables

| Pane    | Shows          |
|:--------|:---------------|
| List    | every note     |
| Editor  | the source     |
| Preview | rendered HTML  |
";

/// The two notes installed when nothing usable is persisted.
pub fn seed_notes() -> Vec<Note> {
    let welcome_id = mint_id(|_| false);
    let showcase_id = mint_id(|id| id == welcome_id);
    vec![
        Note::new(welcome_id, WELCOME_TITLE, WELCOME.to_string()),
        Note::new(showcase_id, SHOWCASE_TITLE, SHOWCASE.to_string()),
    ]
}
