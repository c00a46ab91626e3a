//! The fixed orientation survey: question catalog and answer collection.
//!
//! The catalog is defined once at process start and must stay identical to
//! the one used when the classifier was trained; the encoder reconciles the
//! two through the frozen feature-column list, keyed by prompt text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Joined value stored when a multi-choice question has no selection.
pub const MULTI_NONE: &str = "Aucune";
/// Value stored when a free-text question is left blank.
pub const TEXT_NONE: &str = "Non spécifié";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    FreeText,
}

/// One survey question. Prompt text is the stable key the model was
/// trained against, not the short id.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSpec {
    pub id: &'static str,
    pub prompt: &'static str,
    pub kind: QuestionKind,
    pub options: &'static [&'static str],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unanswered question: {prompt}")]
    Unanswered { prompt: String },
}

pub static QUESTION_CATALOG: &[QuestionSpec] = &[
    QuestionSpec {
        id: "age",
        prompt: "Quel est ton âge ?",
        kind: QuestionKind::SingleChoice,
        options: &["Moins de 14 ans", "14-15 ans", "16-17 ans", "18 ans et plus"],
    },
    QuestionSpec {
        id: "niveau_scolaire",
        prompt: "Quel est ton niveau scolaire actuel ?",
        kind: QuestionKind::SingleChoice,
        options: &["Seconde", "Première", "Terminale", "Post-bac / Université"],
    },
    QuestionSpec {
        id: "matieres_preferees",
        prompt: "Quelles sont tes matières préférées à l'école ?",
        kind: QuestionKind::MultiChoice,
        options: &[
            "Mathématiques",
            "Physique-Chimie",
            "Français",
            "Histoire-Géographie",
            "Langues étrangères",
            "Arts plastiques / Musique",
            "Sciences de la vie et de la Terre",
        ],
    },
    QuestionSpec {
        id: "matieres_moins_aimees",
        prompt: "Quelles matières aimes-tu le moins ?",
        kind: QuestionKind::MultiChoice,
        options: &[
            "Mathématiques",
            "Physique-Chimie",
            "Français",
            "Histoire-Géographie",
            "Langues étrangères",
            "Arts plastiques / Musique",
            "Sciences de la vie et de la Terre",
        ],
    },
    QuestionSpec {
        id: "activites",
        prompt: "Quel type d'activités préfères-tu en dehors de l'école ?",
        kind: QuestionKind::MultiChoice,
        options: &[
            "Sports",
            "Lecture",
            "Jeux vidéo",
            "Sorties avec des amis",
            "Activités artistiques",
            "Bénévolat / Engagement associatif",
        ],
    },
    QuestionSpec {
        id: "travail_groupe",
        prompt: "Préfères-tu travailler seul(e) ou en groupe ?",
        kind: QuestionKind::SingleChoice,
        options: &["Seul(e)", "En groupe", "Ça dépend des situations"],
    },
    QuestionSpec {
        id: "sciences",
        prompt: "Aimes-tu les matières scientifiques (maths, physique, chimie) ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui, beaucoup", "Un peu", "Pas du tout"],
    },
    QuestionSpec {
        id: "litteraires",
        prompt: "Préfères-tu les matières littéraires (français, histoire, langues) ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui, beaucoup", "Un peu", "Pas du tout"],
    },
    QuestionSpec {
        id: "arts",
        prompt: "Es-tu intéressé(e) par les arts (musique, dessin, théâtre) ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Non", "Un peu"],
    },
    QuestionSpec {
        id: "style_apprentissage",
        prompt: "Quel est ton style d'apprentissage préféré ?",
        kind: QuestionKind::SingleChoice,
        options: &[
            "Visuel (images, schémas)",
            "Auditif (écoute, explications orales)",
            "Kinesthésique (faire, manipuler)",
            "Je ne sais pas",
        ],
    },
    QuestionSpec {
        id: "problemes",
        prompt: "Aimes-tu résoudre des problèmes ou des énigmes ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui, beaucoup", "Parfois", "Non"],
    },
    QuestionSpec {
        id: "technologies",
        prompt: "Te sens-tu à l'aise avec les technologies et l'informatique ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Moyennement", "Non"],
    },
    QuestionSpec {
        id: "chiffres",
        prompt: "Aimes-tu travailler avec des chiffres et des données ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Parfois", "Non"],
    },
    QuestionSpec {
        id: "sante_social",
        prompt: "Es-tu attiré(e) par les métiers liés à la santé ou au social ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Non", "Peut-être"],
    },
    QuestionSpec {
        id: "langues",
        prompt: "Quel est ton niveau en langues étrangères ?",
        kind: QuestionKind::SingleChoice,
        options: &["Débutant", "Intermédiaire", "Avancé", "Courant / bilingue"],
    },
    QuestionSpec {
        id: "metiers_type",
        prompt: "Préfères-tu des métiers créatifs ou techniques ?",
        kind: QuestionKind::SingleChoice,
        options: &["Créatifs", "Techniques", "Les deux", "Je ne sais pas"],
    },
    QuestionSpec {
        id: "recherche",
        prompt: "Aimes-tu la recherche et l'analyse ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Un peu", "Non"],
    },
    QuestionSpec {
        id: "idee_metier",
        prompt: "As-tu déjà une idée du métier que tu aimerais faire plus tard ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui, clairement", "J'ai quelques idées", "Pas encore"],
    },
    QuestionSpec {
        id: "environnement_travail",
        prompt: "Quel type d'environnement de travail te motive le plus ?",
        kind: QuestionKind::SingleChoice,
        options: &[
            "Bureau / travail sur ordinateur",
            "Travail en extérieur",
            "Laboratoire / recherche",
            "Travail manuel",
            "Je ne sais pas",
        ],
    },
    QuestionSpec {
        id: "etudes_longues",
        prompt: "Es-tu prêt(e) à suivre des études longues (plus de 3 ans) ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Non", "Peut-être"],
    },
    QuestionSpec {
        id: "stabilite",
        prompt: "Quelle importance accordes-tu à la stabilité de l'emploi dans ton choix de carrière ?",
        kind: QuestionKind::SingleChoice,
        options: &["Très importante", "Moyennement importante", "Peu importante"],
    },
    QuestionSpec {
        id: "contacts_humains",
        prompt: "Préfères-tu un métier avec beaucoup de contacts humains ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui", "Non", "Parfois"],
    },
    QuestionSpec {
        id: "role_equipe",
        prompt: "Quel rôle voudrais-tu avoir dans une équipe ?",
        kind: QuestionKind::SingleChoice,
        options: &[
            "Leader / chef de projet",
            "Exécutant / spécialiste",
            "Créatif / innovateur",
            "Organisateur / planificateur",
            "Je ne sais pas",
        ],
    },
    QuestionSpec {
        id: "qualites",
        prompt: "Quelles qualités personnelles te décrivent le mieux ?",
        kind: QuestionKind::MultiChoice,
        options: &[
            "Curieux(se)",
            "Organisé(e)",
            "Patient(e)",
            "Créatif(ve)",
            "Rigoureux(se)",
            "Dynamique",
        ],
    },
    QuestionSpec {
        id: "stress",
        prompt: "Comment gères-tu le stress ou les situations difficiles ?",
        kind: QuestionKind::SingleChoice,
        options: &[
            "Je reste calme et cherche des solutions",
            "Je me sens parfois dépassé(e)",
            "Je préfère éviter ces situations",
        ],
    },
    QuestionSpec {
        id: "projets",
        prompt: "As-tu déjà participé à des projets ou activités extra-scolaires ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui, plusieurs fois", "Oui, une fois ou deux", "Non"],
    },
    QuestionSpec {
        id: "innovation",
        prompt: "Quelle place accordes-tu à l'innovation et à la créativité dans ton travail ?",
        kind: QuestionKind::SingleChoice,
        options: &["Très importante", "Moyennement importante", "Peu importante"],
    },
    QuestionSpec {
        id: "entrepreneuriat",
        prompt: "Es-tu intéressé(e) par l'entrepreneuriat ou créer ta propre entreprise ?",
        kind: QuestionKind::SingleChoice,
        options: &["Oui, beaucoup", "Un peu", "Pas du tout"],
    },
    QuestionSpec {
        id: "objectifs",
        prompt: "Quels sont tes objectifs personnels à court terme (1-2 ans) ?",
        kind: QuestionKind::FreeText,
        options: &[],
    },
    QuestionSpec {
        id: "vie_pro",
        prompt: "Comment imagines-tu ta vie professionnelle dans 10 ans ?",
        kind: QuestionKind::FreeText,
        options: &[],
    },
];

/// Look up a catalog question by its short id.
pub fn question(id: &str) -> Option<&'static QuestionSpec> {
    QUESTION_CATALOG.iter().find(|q| q.id == id)
}

/// A student's raw responses, keyed by question prompt text.
///
/// Built fresh per session and handed straight to the encoder; never
/// persisted as-is (the submission payload carries its own copy).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single-choice answer.
    pub fn set_choice(&mut self, prompt: &str, option: &str) {
        self.0.insert(prompt.to_string(), option.to_string());
    }

    /// Record a multi-choice answer. Selections are comma-joined in the
    /// order given; an empty selection is stored as [`MULTI_NONE`].
    pub fn set_multi(&mut self, prompt: &str, selected: &[&str]) {
        let value = if selected.is_empty() {
            MULTI_NONE.to_string()
        } else {
            selected.join(", ")
        };
        self.0.insert(prompt.to_string(), value);
    }

    /// Record a free-text answer; blank input is stored as [`TEXT_NONE`].
    pub fn set_text(&mut self, prompt: &str, text: &str) {
        let trimmed = text.trim();
        let value = if trimmed.is_empty() { TEXT_NONE } else { trimmed };
        self.0.insert(prompt.to_string(), value.to_string());
    }

    pub fn get(&self, prompt: &str) -> Option<&str> {
        self.0.get(prompt).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks that every catalog question has an answer. Choice questions
    /// block submission when missing; free-text defaults are filled in
    /// rather than rejected, matching how the survey form behaves.
    pub fn validate_complete(&mut self) -> Result<(), CatalogError> {
        for q in QUESTION_CATALOG {
            if self.0.contains_key(q.prompt) {
                continue;
            }
            match q.kind {
                QuestionKind::FreeText => {
                    self.0.insert(q.prompt.to_string(), TEXT_NONE.to_string());
                }
                QuestionKind::SingleChoice | QuestionKind::MultiChoice => {
                    return Err(CatalogError::Unanswered {
                        prompt: q.prompt.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a AnswerSet {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a complete answer set by taking the first option of every
/// choice question and the blank default for free text.
pub fn first_option_answers() -> AnswerSet {
    let mut answers = AnswerSet::new();
    for q in QUESTION_CATALOG {
        match q.kind {
            QuestionKind::SingleChoice => answers.set_choice(q.prompt, q.options[0]),
            QuestionKind::MultiChoice => answers.set_multi(q.prompt, &q.options[..1]),
            QuestionKind::FreeText => answers.set_text(q.prompt, ""),
        }
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_full_survey() {
        assert_eq!(QUESTION_CATALOG.len(), 30);
        let free_text = QUESTION_CATALOG
            .iter()
            .filter(|q| q.kind == QuestionKind::FreeText)
            .count();
        assert_eq!(free_text, 2);
        // Prompts are the feature keys; duplicates would collide in encoding.
        let mut prompts: Vec<_> = QUESTION_CATALOG.iter().map(|q| q.prompt).collect();
        prompts.sort_unstable();
        prompts.dedup();
        assert_eq!(prompts.len(), QUESTION_CATALOG.len());
    }

    #[test]
    fn multi_choice_joins_and_defaults() {
        let mut answers = AnswerSet::new();
        answers.set_multi("Quelles sont tes matières préférées à l'école ?", &["Mathématiques", "Français"]);
        assert_eq!(
            answers.get("Quelles sont tes matières préférées à l'école ?"),
            Some("Mathématiques, Français")
        );

        answers.set_multi("Quelles matières aimes-tu le moins ?", &[]);
        assert_eq!(answers.get("Quelles matières aimes-tu le moins ?"), Some(MULTI_NONE));
    }

    #[test]
    fn blank_free_text_gets_placeholder() {
        let mut answers = AnswerSet::new();
        answers.set_text("Comment imagines-tu ta vie professionnelle dans 10 ans ?", "   ");
        assert_eq!(
            answers.get("Comment imagines-tu ta vie professionnelle dans 10 ans ?"),
            Some(TEXT_NONE)
        );
    }

    #[test]
    fn validation_reports_first_missing_choice() {
        let mut answers = AnswerSet::new();
        let err = answers.validate_complete().unwrap_err();
        assert_eq!(
            err,
            CatalogError::Unanswered {
                prompt: "Quel est ton âge ?".to_string()
            }
        );
    }

    #[test]
    fn validation_fills_free_text_defaults() {
        let mut answers = first_option_answers();
        assert!(answers.validate_complete().is_ok());
        assert_eq!(answers.len(), QUESTION_CATALOG.len());
        assert_eq!(
            answers.get("Quels sont tes objectifs personnels à court terme (1-2 ans) ?"),
            Some(TEXT_NONE)
        );
    }
}
