// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;

use alpheric_content_core::domain::slug::slugify;

pub fn handle_command(text: &str) -> Result<()> {
    let slug = slugify(text);
    if slug.is_empty() {
        anyhow::bail!("'{}' has no characters that survive slugification", text);
    }
    println!("{}", slug);
    Ok(())
}
