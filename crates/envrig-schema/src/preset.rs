use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub descriptor: &'static str,
}

pub const BUILTIN_PRESETS: &[Preset] = &[
    Preset {
        name: "minimal",
        description: "Empty descriptor with dotenv loading",
        descriptor: r#"[dotenv]
enable = true
filename = ".env"
"#,
    },
    Preset {
        name: "rust",
        description: "Rust toolchain with rustfmt and clippy pre-commit hooks",
        descriptor: r#"[languages.rust]
enable = true

[hooks.rustfmt]
enable = true

[hooks.clippy]
enable = true

[dotenv]
enable = true
filename = ".env"
"#,
    },
    Preset {
        name: "python",
        description: "Python toolchain with black and ruff pre-commit hooks",
        descriptor: r#"[languages.python]
enable = true

[hooks.black]
enable = true

[hooks.ruff]
enable = true

[dotenv]
enable = true
filename = ".env"
"#,
    },
    Preset {
        name: "go",
        description: "Go toolchain with gofmt and go vet pre-commit hooks",
        descriptor: r#"[languages.go]
enable = true

[hooks.gofmt]
enable = true

[hooks.govet]
enable = true

[dotenv]
enable = true
filename = ".env"
"#,
    },
    Preset {
        name: "node",
        description: "Node.js toolchain with prettier and eslint pre-commit hooks",
        descriptor: r#"[languages.nodejs]
enable = true

[hooks.prettier]
enable = true

[hooks.eslint]
enable = true

[dotenv]
enable = true
filename = ".env"
"#,
    },
];

pub fn get_preset(name: &str) -> Option<&'static Preset> {
    BUILTIN_PRESETS.iter().find(|p| p.name == name)
}

pub fn list_presets() -> &'static [Preset] {
    BUILTIN_PRESETS
}
