use vfxbin::{ConditionList, EntityTable, ResolverTable, System};

/// What a piece of report text is, mapped to one SGR sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Title,
    Section,
    Index,
    System,
    Span,
    Owner,
    Target,
    Warning,
    Failure,
    Muted,
}

impl Role {
    fn sgr(self) -> &'static str {
        match self {
            Role::Title => "1;36",
            Role::Section | Role::Index => "90",
            Role::System => "1;32",
            Role::Span | Role::Warning => "33",
            Role::Owner => "34",
            Role::Target => "36",
            Role::Failure => "31",
            Role::Muted => "2",
        }
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn style(&self, role: Role, s: impl AsRef<str>) -> String {
        if self.enabled { format!("\x1b[{}m{}\x1b[0m", role.sgr(), s.as_ref()) } else { s.as_ref().to_string() }
    }

    fn section(&self, title: &str) -> String {
        self.style(Role::Section, format!("━━━ {title} ━━━"))
    }

    fn muted(&self, s: impl AsRef<str>) -> String {
        self.style(Role::Muted, s)
    }
}

pub fn print_table(path: &str, table: &EntityTable, balanced: bool, color: bool) {
    let palette = Palette::new(color);
    println!("\n{}", palette.style(Role::Title, format!("⚙  Inspecting: {path}")));
    if !balanced {
        println!("{}", palette.style(Role::Failure, "  ✗ braces are unbalanced; edits will be refused"));
    }

    println!("\n{}", palette.section("Systems"));
    if table.systems.is_empty() {
        println!("{}", palette.muted("  No VfxSystemDefinitionData entries"));
    }
    for (idx, system) in table.systems.iter().enumerate() {
        print_system(idx, system, &palette);
    }

    println!("\n{}", palette.section("Resolvers"));
    if table.resolvers.is_empty() {
        println!("{}", palette.muted("  No ResourceResolver entries"));
    }
    for resolver in &table.resolvers {
        print_resolver(resolver, &palette);
    }

    if !table.conditions.is_empty() {
        println!("\n{}", palette.section("Conditions"));
        for list in &table.conditions {
            print_conditions(list, &palette);
        }
    }

    if !table.clips.is_empty() {
        println!("\n{}", palette.section("Clips"));
        for clip in &table.clips {
            let effects = clip.events.iter().filter(|e| e.effect_key.is_some()).count();
            println!(
                "  {} {} {}",
                palette.style(Role::Owner, clip.name.to_string()),
                palette.muted(&clip.type_name),
                palette.muted(format!("│ {} events, {effects} with effects", clip.events.len()))
            );
        }
    }

    let mismatches: Vec<&System> = table.mismatches().collect();
    if !mismatches.is_empty() {
        println!("\n{}", palette.style(Role::Warning, "Name mismatches:"));
        for system in mismatches {
            if let Some(m) = &system.name_mismatch {
                println!("  • header {} vs particleName \"{}\"", m.header, m.particle_name);
            }
        }
    }
    println!();
}

fn print_system(idx: usize, system: &System, palette: &Palette) {
    println!(
        "  {} {} {} {}",
        palette.style(Role::Index, format!("[{idx}]")),
        palette.style(Role::System, &system.display_name),
        palette.muted("│"),
        palette.style(Role::Span, format!("span {}..{}", system.span.start, system.span.end)),
    );
    if system.key.as_text() != Some(system.display_name.as_str()) {
        println!("      {} {}", palette.muted("key:"), palette.style(Role::Owner, system.key.to_source()));
    }
    if let Some(transform) = &system.transform {
        let [_, _, _, [x, y, z, _]] = transform.rows();
        println!("      {} {x}, {y}, {z}", palette.muted("translation:"));
    }
    let names: Vec<&str> = system.emitter_names().collect();
    if names.is_empty() {
        println!("      {}", palette.muted("no emitters"));
    } else {
        println!("      {} {}", palette.muted("emitters:"), palette.style(Role::Target, names.join(", ")));
    }
}

fn print_resolver(resolver: &ResolverTable, palette: &Palette) {
    println!(
        "  {} {}",
        palette.style(Role::Owner, resolver.scope.to_string()),
        palette.muted(format!("│ {} entries", resolver.entries.len()))
    );
    for entry in resolver.entries.iter().take(5) {
        println!("      {} {} {}", entry.key, palette.muted("→"), palette.style(Role::Target, entry.target.to_string()));
    }
    if resolver.entries.len() > 5 {
        println!("      {}", palette.muted(format!("... +{} more", resolver.entries.len() - 5)));
    }
}

fn print_conditions(list: &ConditionList, palette: &Palette) {
    let owner = list.owner.as_ref().map_or_else(|| "(no owner)".to_string(), |o| o.to_string());
    println!("  {}", palette.style(Role::Owner, owner));
    for (idx, block) in list.records.iter().enumerate() {
        let label = palette.style(Role::Index, format!("[{idx}]"));
        match &block.record {
            Ok(record) => println!(
                "      {label} {} {}",
                palette.style(Role::System, record.driver.kind_name()),
                palette.muted(format!("│ {} vfx, {} shown, {} hidden", record.vfx.len(), record.submeshes_to_show.len(), record.submeshes_to_hide.len()))
            ),
            Err(reason) => println!("      {label} {}", palette.style(Role::Failure, format!("✗ {reason}"))),
        }
    }
}
