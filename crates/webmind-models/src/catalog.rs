//! The built-in profile catalog.

use crate::profile::{ModelProfile, ProfileTier};

/// Profiles shipped with the extension, smallest first.
pub static BUILTIN_PROFILES: &[ModelProfile] = &[
    ModelProfile {
        id: "gemma-2-2b",
        display_name: "Gemma-2-2B-it",
        backend_id: "gemma-2-2b-it-q4f16_1-MLC",
        size_on_disk: "1.9 GB",
        memory_required_gb: 1.9,
        tier: ProfileTier::Small,
        specialty: "Translation & Quick tasks",
        features: &["Translation", "Text Enhancement", "Fast"],
        description: "Multilingual support (RU/EN), fast responses, best for quick translations",
    },
    ModelProfile {
        id: "qwen2.5-1.5b",
        display_name: "Qwen2.5-1.5B-Instruct",
        backend_id: "Qwen2.5-1.5B-Instruct-q4f16_1-MLC",
        size_on_disk: "2.2 GB",
        memory_required_gb: 2.2,
        tier: ProfileTier::Small,
        specialty: "Summarization & Context",
        features: &["Summarization", "Context Analysis", "Structured Data"],
        description: "Excellent context understanding, page analysis, meeting summaries",
    },
    ModelProfile {
        id: "phi-3.5-mini",
        display_name: "Phi-3.5-mini-instruct",
        backend_id: "Phi-3.5-mini-instruct-q4f16_1-MLC",
        size_on_disk: "2.8 GB",
        memory_required_gb: 2.8,
        tier: ProfileTier::Medium,
        specialty: "Technical & Code",
        features: &["Technical", "Code", "Documentation"],
        description: "Strong technical reasoning, code understanding, developer-focused",
    },
    ModelProfile {
        id: "mistral-7b",
        display_name: "Mistral-7B-Instruct-v0.3",
        backend_id: "Mistral-7B-Instruct-v0.3-q4f16_1-MLC",
        size_on_disk: "3.8 GB",
        memory_required_gb: 3.8,
        tier: ProfileTier::Medium,
        specialty: "Creative & General",
        features: &["Creative Writing", "Email", "Templates"],
        description: "Excellent instruction following, creative writing, email composition",
    },
    ModelProfile {
        id: "qwen2.5-coder-7b",
        display_name: "Qwen2.5-Coder-7B-Instruct",
        backend_id: "Qwen2.5-Coder-7B-Instruct-q4f16_1-MLC",
        size_on_disk: "4.8 GB",
        memory_required_gb: 4.8,
        tier: ProfileTier::Large,
        specialty: "Code & Structured Tasks",
        features: &["Advanced Code", "Technical", "JSON/Markdown"],
        description: "Best-in-class coding, technical analysis, structured data extraction",
    },
    ModelProfile {
        id: "llama-3.2-3b",
        display_name: "Llama-3.2-3B-Instruct",
        backend_id: "Llama-3.2-3B-Instruct-q4f16_1-MLC",
        size_on_disk: "6.2 GB",
        memory_required_gb: 6.2,
        tier: ProfileTier::Large,
        specialty: "Advanced Reasoning & Long Context",
        features: &["Best Quality", "Long Context", "Multilingual"],
        description: "Superior reasoning, 8K context, 100+ languages, highest quality",
    },
];
