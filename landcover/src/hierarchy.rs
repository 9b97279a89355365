//! Hiérarchie des couvertures et légende imbriquée
//!
//! Les noms complets de la palette encodent deux niveaux :
//! `"1. Bosque"` (groupe) et `"1.1. Formación forestal"` (sous-niveau).
//!
//! Grammaire :
//!
//! ```text
//! name  := main ( "." sub )? "." ws* label
//! main  := digit+
//! sub   := digit+
//! label := texte non vide après trim
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::parser::palette::Palette;
use crate::types::ClassId;

/// Clé du groupe fourre-tout
pub const UNGROUPED_LEVEL: &str = "ungrouped";

/// Nom du groupe fourre-tout
pub const UNGROUPED_NAME: &str = "Other coverages";

/// Couleur du groupe fourre-tout
pub const UNGROUPED_COLOR: &str = "#cccccc";

/// Couleurs de repli (index = niveau principal modulo 10)
pub const FALLBACK_COLORS: [&str; 10] = [
    "#ff6384", "#36a2eb", "#ffcd56", "#4bc0c0", "#9966ff", "#ff9f40", "#c9cbcf", "#2e86ab",
    "#a23b72", "#f18f01",
];

/// Résultat du parsing d'un nom complet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageLevel<'a> {
    /// Niveau principal : `"4. MainLabel"`
    Group { main: &'a str, label: &'a str },
    /// Sous-niveau : `"2.3. SubLabel"`
    Leaf {
        main: &'a str,
        sub: &'a str,
        label: &'a str,
    },
    /// Nom sans hiérarchie reconnaissable
    Ungrouped,
}

impl<'a> CoverageLevel<'a> {
    pub fn main_level(&self) -> Option<&'a str> {
        match *self {
            CoverageLevel::Group { main, .. } | CoverageLevel::Leaf { main, .. } => Some(main),
            CoverageLevel::Ungrouped => None,
        }
    }

    pub fn sub_level(&self) -> Option<&'a str> {
        match *self {
            CoverageLevel::Leaf { sub, .. } => Some(sub),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&'a str> {
        match *self {
            CoverageLevel::Group { label, .. } | CoverageLevel::Leaf { label, .. } => Some(label),
            CoverageLevel::Ungrouped => None,
        }
    }
}

/// Préfixe de chiffres ASCII et reste
fn split_digits(s: &str) -> (&str, &str) {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    s.split_at(end)
}

fn non_empty_label(s: &str) -> Option<&str> {
    let label = s.trim();
    (!label.is_empty()).then_some(label)
}

/// Parse un nom complet de la palette.
///
/// Si la branche sous-niveau ne peut aboutir (`"1.1 Texte"`, `"1.1."`),
/// le nom est lu comme un groupe dont le libellé commence après le premier point.
pub fn parse_hierarchy(full_name: &str) -> CoverageLevel<'_> {
    let name = full_name.trim_start();

    let (main, rest) = split_digits(name);
    if main.is_empty() {
        return CoverageLevel::Ungrouped;
    }
    let Some(after_main) = rest.strip_prefix('.') else {
        return CoverageLevel::Ungrouped;
    };

    let (sub, after_sub) = split_digits(after_main);
    if !sub.is_empty() {
        if let Some(label) = after_sub.strip_prefix('.').and_then(non_empty_label) {
            return CoverageLevel::Leaf { main, sub, label };
        }
    }

    match non_empty_label(after_main) {
        Some(label) => CoverageLevel::Group { main, label },
        None => CoverageLevel::Ungrouped,
    }
}

/// Noeud de la légende (groupe principal ou sous-élément)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyGroup {
    /// Niveau ("1", "1.1") ou `ungrouped`
    pub level: String,
    pub name: String,
    pub color: String,
    /// Classe représentée, `None` pour un groupe synthétique
    pub id: Option<ClassId>,
    pub sub_items: Vec<HierarchyGroup>,
}

impl HierarchyGroup {
    fn item(level: String, name: &str, color: String, id: ClassId) -> Self {
        Self {
            level,
            name: name.to_string(),
            color,
            id: Some(id),
            sub_items: Vec::new(),
        }
    }

    fn ungrouped() -> Self {
        Self {
            level: UNGROUPED_LEVEL.to_string(),
            name: UNGROUPED_NAME.to_string(),
            color: UNGROUPED_COLOR.to_string(),
            id: None,
            sub_items: Vec::new(),
        }
    }

    pub fn is_ungrouped(&self) -> bool {
        self.level == UNGROUPED_LEVEL
    }
}

/// Couleur de repli d'un niveau principal
pub fn fallback_color(main_level: &str) -> &'static str {
    let index = main_level.parse::<u64>().map(|n| n % 10).unwrap_or(0) as usize;
    FALLBACK_COLORS[index]
}

/// Cherche dans toute la palette la classe de niveau principal `main_level`
pub fn find_main_level<'p>(
    palette: &'p Palette,
    main_level: &str,
) -> Option<(&'p str, Option<&'p str>)> {
    palette.iter().find_map(|info| match parse_hierarchy(&info.full_name) {
        CoverageLevel::Group { main, label } if same_level(main, main_level) => {
            Some((label, info.color.as_deref()))
        }
        _ => None,
    })
}

/// Compare deux niveaux numériquement ("01" == "1")
fn same_level(a: &str, b: &str) -> bool {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

fn level_sort_key(group: &HierarchyGroup) -> (bool, u64) {
    (
        group.is_ungrouped(),
        group.level.parse::<u64>().unwrap_or(u64::MAX),
    )
}

/// Regroupe les classes par niveau principal pour la légende.
///
/// Le nom d'un groupe vient (a) de la classe de niveau principal présente
/// dans `coverage_ids`, (b) sinon d'une classe de ce niveau n'importe où dans
/// la palette, (c) sinon `Level {n}`. Les classes absentes de la palette sont
/// ignorées. Groupes triés par niveau croissant, fourre-tout en dernier.
pub fn build_groups(coverage_ids: &[ClassId], palette: &Palette) -> Vec<HierarchyGroup> {
    let mut ids = coverage_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut groups: Vec<HierarchyGroup> = Vec::new();
    let mut by_level: HashMap<u64, usize> = HashMap::new();
    let mut ungrouped: Option<HierarchyGroup> = None;

    for id in ids {
        let Some(info) = palette.get(id) else {
            debug!(class = id, "Class missing from palette, left out of legend");
            continue;
        };
        let color = info.color.clone();

        match parse_hierarchy(&info.full_name) {
            CoverageLevel::Group { main, label } => {
                let level = main.parse::<u64>().unwrap_or(u64::MAX);
                let color = color.unwrap_or_else(|| fallback_color(main).to_string());
                match by_level.get(&level).copied() {
                    Some(index) if groups[index].id.is_none() => {
                        // Un sous-niveau a créé le groupe avant sa classe principale
                        let group = &mut groups[index];
                        group.name = label.to_string();
                        group.color = color;
                        group.id = Some(id);
                    }
                    Some(_) => {}
                    None => {
                        by_level.insert(level, groups.len());
                        groups.push(HierarchyGroup::item(main.to_string(), label, color, id));
                    }
                }
            }
            CoverageLevel::Leaf { main, sub, label } => {
                let level = main.parse::<u64>().unwrap_or(u64::MAX);
                let index = *by_level.entry(level).or_insert_with(|| {
                    let (name, parent_color) = match find_main_level(palette, main) {
                        Some((name, color)) => (name.to_string(), color),
                        None => (format!("Level {main}"), None),
                    };
                    groups.push(HierarchyGroup {
                        level: main.to_string(),
                        name,
                        color: parent_color
                            .map(str::to_string)
                            .unwrap_or_else(|| fallback_color(main).to_string()),
                        id: None,
                        sub_items: Vec::new(),
                    });
                    groups.len() - 1
                });
                let color = color.unwrap_or_else(|| groups[index].color.clone());
                groups[index].sub_items.push(HierarchyGroup::item(
                    format!("{main}.{sub}"),
                    label,
                    color,
                    id,
                ));
            }
            CoverageLevel::Ungrouped => {
                let bucket = ungrouped.get_or_insert_with(HierarchyGroup::ungrouped);
                let color = color.unwrap_or_else(|| UNGROUPED_COLOR.to_string());
                bucket.sub_items.push(HierarchyGroup::item(
                    UNGROUPED_LEVEL.to_string(),
                    &info.full_name,
                    color,
                    id,
                ));
            }
        }
    }

    groups.sort_by_key(level_sort_key);
    groups.extend(ungrouped);
    groups
}
