//! Built-in habit catalog
//!
//! Custom definitions saved by the user take precedence over these by id.

use crate::types::{HabitDefinition, HabitKind};

const CATALOG: &[(&str, &str, HabitKind, i64, &str)] = &[
    ("habit_entrenamiento", "Entrenamiento", HabitKind::Healthy, 4, "💪"),
    ("habit_leer", "Leer", HabitKind::Healthy, 3, "📚"),
    ("habit_yoga", "Yoga", HabitKind::Healthy, 3, "🧘"),
    ("habit_agua", "Agua", HabitKind::Healthy, 1, "💧"),
    ("habit_comida_saludable", "Comida Saludable", HabitKind::Healthy, 2, "🥗"),
    ("habit_bicicleta", "Bicicleta", HabitKind::Healthy, 2, "🚴"),
    ("habit_skate", "Skate", HabitKind::Healthy, 2, "🛹"),
    ("habit_surf", "Surf", HabitKind::Healthy, 3, "🌊"),
    ("habit_sueno", "8h de sueño", HabitKind::Healthy, 4, "😴"),
    ("habit_coding", "Coding", HabitKind::Healthy, 2, "💻"),
    ("habit_golosina", "Golosina", HabitKind::Unhealthy, -2, "🍬"),
    ("habit_comida_rapida", "Comida Rápida", HabitKind::Unhealthy, -3, "🍔"),
    ("habit_alcohol", "Alcohol", HabitKind::Unhealthy, -4, "🍺"),
    ("habit_redes_sociales", "Redes Sociales", HabitKind::Unhealthy, -2, "📱"),
    ("habit_procrastinacion", "Procrastinación", HabitKind::Unhealthy, -3, "⏳"),
];

pub fn predefined_habits() -> Vec<HabitDefinition> {
    CATALOG
        .iter()
        .map(|(id, name, kind, score, icon)| HabitDefinition {
            id: (*id).to_string(),
            name: (*name).to_string(),
            kind: *kind,
            score: *score,
            icon: Some((*icon).to_string()),
        })
        .collect()
}

/// Merge custom definitions over the catalog, replacing entries with the same id
pub fn merge_definitions(custom: Vec<HabitDefinition>) -> Vec<HabitDefinition> {
    let mut merged = predefined_habits();
    for habit in custom {
        match merged.iter_mut().find(|h| h.id == habit.id) {
            Some(existing) => *existing = habit,
            None => merged.push(habit),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_signs_match_kind() {
        for habit in predefined_habits() {
            match habit.kind {
                HabitKind::Healthy => assert!(habit.score > 0, "{}", habit.id),
                HabitKind::Unhealthy => assert!(habit.score < 0, "{}", habit.id),
            }
        }
    }

    #[test]
    fn test_custom_overrides_catalog() {
        let merged = merge_definitions(vec![
            HabitDefinition {
                id: "habit_leer".to_string(),
                name: "Leer 30 min".to_string(),
                kind: HabitKind::Healthy,
                score: 5,
                icon: None,
            },
            HabitDefinition {
                id: "habit_meditar".to_string(),
                name: "Meditar".to_string(),
                kind: HabitKind::Healthy,
                score: 2,
                icon: None,
            },
        ]);

        assert_eq!(merged.len(), predefined_habits().len() + 1);
        let leer = merged.iter().find(|h| h.id == "habit_leer").unwrap();
        assert_eq!(leer.score, 5);
        assert!(merged.iter().any(|h| h.id == "habit_meditar"));
    }
}
