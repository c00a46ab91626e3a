//! Result Resolver: domain metadata, domain→category tags and the school
//! directory.
//!
//! Lookups never fail: an unknown domain resolves to the default entry and
//! an empty school filter falls back to the full directory. Showing a
//! generic result beats showing nothing at the end of a questionnaire.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Display metadata for one predicted domain.
#[derive(Debug, Clone, Serialize)]
pub struct DomainInfo {
    pub icon: &'static str,
    pub description: &'static str,
    pub careers: &'static [&'static str],
}

lazy_static! {
    static ref DOMAIN_INFO: HashMap<&'static str, DomainInfo> = {
        let mut m = HashMap::new();
        m.insert(
            "informatique / ingénierie",
            DomainInfo {
                icon: "💻",
                description: "Votre profil montre d'excellentes aptitudes pour les technologies et la résolution de problèmes techniques. Vous seriez bien adapté aux métiers de l'informatique et de l'ingénierie.",
                careers: &[
                    "Développeur Logiciel",
                    "Ingénieur Système",
                    "Data Scientist",
                    "Ingénieur en Cybersécurité",
                    "Architecte Logiciel",
                    "Ingénieur Cloud",
                    "Administrateur Base de Données",
                ],
            },
        );
        m.insert(
            "technologie / technique",
            DomainInfo {
                icon: "⚙️",
                description: "Votre profil technique et votre goût pour les solutions concrètes vous orientent vers les métiers de la technologie et des sciences appliquées.",
                careers: &[
                    "Ingénieur Mécanique",
                    "Technicien Supérieur",
                    "Ingénieur Industriel",
                    "Expert en Automatisation",
                    "Chef de Projet Technique",
                    "Ingénieur Qualité",
                ],
            },
        );
        m.insert(
            "arts / création",
            DomainInfo {
                icon: "🎨",
                description: "Votre créativité et votre sens artistique marqués vous destinent à des carrières dans les domaines artistiques et créatifs.",
                careers: &[
                    "Designer Graphique",
                    "Artiste Plasticien",
                    "Directeur Artistique",
                    "Architecte d'Intérieur",
                    "Photographe",
                    "Animateur 3D",
                ],
            },
        );
        m.insert(
            "communication / marketing",
            DomainInfo {
                icon: "📢",
                description: "Vos talents de communication et votre aisance relationnelle sont des atouts pour les métiers du marketing et de la communication.",
                careers: &[
                    "Responsable Marketing",
                    "Chargé de Communication",
                    "Community Manager",
                    "Chef de Publicité",
                    "Responsable Événementiel",
                    "Journaliste",
                ],
            },
        );
        m.insert(
            "lettres / sciences humaines",
            DomainInfo {
                icon: "📚",
                description: "Votre intérêt pour les sciences humaines et votre esprit d'analyse vous ouvrent des perspectives dans divers domaines littéraires.",
                careers: &[
                    "Enseignant",
                    "Chercheur en Sciences Humaines",
                    "Éditeur",
                    "Traducteur",
                    "Conseiller en Orientation",
                    "Bibliothécaire",
                ],
            },
        );
        m.insert(
            "recherche / sciences",
            DomainInfo {
                icon: "🔬",
                description: "Votre esprit scientifique et votre curiosité intellectuelle sont des atouts pour une carrière dans la recherche scientifique.",
                careers: &[
                    "Chercheur en Biologie",
                    "Physicien",
                    "Chimiste",
                    "Mathématicien",
                    "Géologue",
                    "Astronome",
                ],
            },
        );
        m.insert(
            "santé / social",
            DomainInfo {
                icon: "🏥",
                description: "Votre intérêt pour les autres et votre sens du service vous orientent vers les métiers de la santé et du social.",
                careers: &[
                    "Médecin",
                    "Infirmier",
                    "Psychologue",
                    "Assistant Social",
                    "Éducateur Spécialisé",
                    "Ergothérapeute",
                ],
            },
        );
        m.insert(
            "commerce / gestion",
            DomainInfo {
                icon: "💰",
                description: "Vos aptitudes pour la gestion et le commerce vous prédisposent à des carrières dans le monde des affaires.",
                careers: &[
                    "Responsable Commercial",
                    "Chef de Projet",
                    "Analyste Financier",
                    "Responsable RH",
                    "Entrepreneur",
                    "Responsable Logistique",
                ],
            },
        );
        m.insert(
            "droit / sciences politiques",
            DomainInfo {
                icon: "⚖️",
                description: "Votre sens de la justice et votre intérêt pour les questions sociétales vous orientent vers les carrières juridiques et politiques.",
                careers: &[
                    "Avocat",
                    "Juriste d'Entreprise",
                    "Notaire",
                    "Diplomate",
                    "Fonctionnaire International",
                    "Consultant en Droit",
                ],
            },
        );
        m.insert(
            "architecture / urbanisme",
            DomainInfo {
                icon: "🏛️",
                description: "Votre sens de l'espace et votre créativité technique vous destinent aux métiers de l'architecture et de l'urbanisme.",
                careers: &[
                    "Architecte",
                    "Urbaniste",
                    "Designer d'Espace",
                    "Architecte Paysagiste",
                    "Ingénieur en BTP",
                    "Conseiller en Urbanisme",
                ],
            },
        );
        m.insert(
            "enseignement / éducation",
            DomainInfo {
                icon: "📝",
                description: "Votre pédagogie et votre envie de transmettre vous orientent vers les métiers de l'enseignement et de l'éducation.",
                careers: &[
                    "Professeur",
                    "Formateur",
                    "Conseiller Pédagogique",
                    "Éducateur",
                    "Directeur d'Établissement",
                    "Chercheur en Éducation",
                ],
            },
        );
        m.insert(
            "environnement / développement durable",
            DomainInfo {
                icon: "🌱",
                description: "Votre sensibilité écologique et votre intérêt pour les enjeux environnementaux vous destinent aux métiers du développement durable.",
                careers: &[
                    "Ingénieur Environnement",
                    "Responsable QHSE",
                    "Consultant en Développement Durable",
                    "Écologue",
                    "Chargé de Mission Environnement",
                    "Géomaticien",
                ],
            },
        );
        m
    };

    static ref DEFAULT_DOMAIN: DomainInfo = DomainInfo {
        icon: "🎯",
        description: "Votre profil polyvalent ouvre de nombreuses possibilités professionnelles dans divers secteurs d'activité.",
        careers: &[
            "Consultant",
            "Chef de Projet",
            "Entrepreneur",
            "Manager",
            "Responsable d'Équipe",
            "Coordinateur",
        ],
    };

    /// Many-to-one mapping from predicted domain to the category tags used
    /// by the school directory.
    static ref DOMAIN_CATEGORIES: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("arts / création", &["Arts"]);
        m.insert("communication / marketing", &["Communication/Marketing"]);
        m.insert("commerce / gestion", &["Commerce", "Gestion"]);
        m.insert("droit / sciences politiques", &["Droit"]);
        m.insert("informatique / ingénierie", &["Informatique", "Ingénierie", "Architecture"]);
        m.insert("lettres / sciences humaines", &["Lettres/Sciences Humaines"]);
        m.insert("recherche / sciences", &["Recherche/Sciences"]);
        m.insert("santé / social", &["Santé/Social"]);
        m.insert("technologie / technique", &["Technologie/Technique"]);
        m.insert("architecture / urbanisme", &["Architecture"]);
        m.insert("enseignement / éducation", &["Enseignement"]);
        m.insert("environnement / développement durable", &["Environnement"]);
        m
    };
}

/// Case-insensitive, trimmed lookup. Unknown domains get the default entry.
pub fn resolve(domain: &str) -> &'static DomainInfo {
    let key = domain.trim().to_lowercase();
    DOMAIN_INFO.get(key.as_str()).unwrap_or(&DEFAULT_DOMAIN)
}

/// Category tags a domain maps to; empty for unknown domains.
pub fn categories_for(domain: &str) -> &'static [&'static str] {
    let key = domain.trim().to_lowercase();
    DOMAIN_CATEGORIES.get(key.as_str()).copied().unwrap_or(&[])
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("school directory not found: {0}")]
    NotFound(std::path::PathBuf),
    #[error("failed to read school directory")]
    Csv(#[from] csv::Error),
}

/// One row of the school directory CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    #[serde(rename = "Nom")]
    pub name: String,
    #[serde(rename = "Ville")]
    pub city: String,
    /// Category tag, matched against [`categories_for`].
    #[serde(rename = "Domaine")]
    pub domain: String,
    #[serde(rename = "Durée")]
    pub duration: String,
}

/// In-memory school list, loaded once from CSV.
#[derive(Debug, Clone, Default)]
pub struct SchoolDirectory {
    schools: Vec<School>,
}

impl SchoolDirectory {
    pub fn new(schools: Vec<School>) -> Self {
        Self { schools }
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        if !path.exists() {
            return Err(DirectoryError::NotFound(path.to_path_buf()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut schools = Vec::new();
        for record in reader.deserialize() {
            schools.push(record?);
        }
        Ok(Self { schools })
    }

    pub fn all(&self) -> &[School] {
        &self.schools
    }

    /// Schools whose category tag matches the domain. When nothing matches
    /// (or the domain is unmapped), the whole directory is returned so the
    /// student always sees options.
    pub fn matching(&self, domain: &str) -> Vec<School> {
        let categories = categories_for(domain);
        let filtered: Vec<School> = self
            .schools
            .iter()
            .filter(|s| categories.contains(&s.domain.as_str()))
            .cloned()
            .collect();
        if filtered.is_empty() {
            if !self.schools.is_empty() {
                warn!("no schools tagged for domain '{domain}'; showing the full directory");
            }
            self.schools.clone()
        } else {
            filtered
        }
    }
}

/// Everything the result screen needs for one predicted domain.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub domain: String,
    pub icon: &'static str,
    pub description: &'static str,
    pub careers: Vec<String>,
    pub schools: Vec<School>,
}

/// Combines the metadata lookup with the institution filter.
pub fn resolve_with_schools(domain: &str, directory: &SchoolDirectory) -> Resolution {
    let info = resolve(domain);
    Resolution {
        domain: domain.trim().to_string(),
        icon: info.icon,
        description: info.description,
        careers: info.careers.iter().map(|c| (*c).to_string()).collect(),
        schools: directory.matching(domain),
    }
}
