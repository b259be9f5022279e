//! Built-in sequences, rotated per company.

use async_trait::async_trait;
use leadpipe_shared::{EmailSequence, Prospect, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::CopyGenerator;

/// One pre-written sequence. `{greeting}` and `{company}` are filled per prospect.
struct Template {
    name: &'static str,
    subject_line: &'static str,
    email_1: &'static str,
    email_2: &'static str,
    email_3: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template {
        name: "problem-first",
        subject_line: "infra + deals perdus?",
        email_1: "{greeting}La plupart des équipes qui accélèrent leur outbound envoient depuis une \
                  infrastructure partagée. Les scores de spam sont partagés aussi, et le taux \
                  d'arrivée en boîte de réception baisse.\n\nNous montons des infrastructures \
                  dédiées, dont {company} reste propriétaire.\n\nJe vous envoie l'audit que nous \
                  utilisons pour repérer où partent les réponses ?",
        email_2: "Infrastructure partagée : vous héritez de la réputation des autres expéditeurs.\n\n\
                  Infrastructure dédiée : vous construisez la vôtre. Mise en place en 24h.\n\n\
                  L'audit vous intéresse ?",
        email_3: "Dernier message de ma part.\n\nSi vos taux de réponse sont sous les 10 %, \
                  l'infrastructure est souvent en cause. L'audit reste disponible.",
    },
    Template {
        name: "direct-roi",
        subject_line: "recrutement + outbound?",
        email_1: "{greeting}Vous recrutez, donc vous accélérez.\n\nSi nous pouvions ajouter dix \
                  rendez-vous qualifiés à l'agenda de {company} le mois prochain, sans charge pour \
                  l'équipe, est-ce que cela vaudrait cinq minutes d'échange ?",
        email_2: "Une équipe de taille comparable obtient 12 à 15 rendez-vous par mois avec ce \
                  dispositif depuis trois mois.\n\nMême méthode, même process.\n\nCinq minutes ?",
        email_3: "Pas de souci si le moment n'est pas le bon.\n\nQuand vous voudrez accélérer \
                  l'outbound sans abîmer votre réputation d'envoi, je reste disponible.",
    },
    Template {
        name: "authority",
        subject_line: "taux d'inbox?",
        email_1: "{greeting}Sur une infrastructure partagée, 40 à 60 % des emails arrivent en boîte \
                  de réception. Sur une infrastructure dédiée, nos clients dépassent 90 %.\n\nPour \
                  une équipe comme celle de {company}, cela représente des centaines de prospects \
                  supplémentaires qui lisent votre message chaque jour.\n\nOn en parle cinq \
                  minutes ?",
        email_2: "Passer de 50 % à 90 % de délivrabilité sur mille emails par jour, c'est 400 \
                  prospects de plus qui vous lisent.\n\nChaque jour.\n\nQu'est-ce que cela \
                  changerait pour vous ?",
        email_3: "Dernière relance.\n\nMise en place en 24h, infrastructure à vous, conforme RGPD. \
                  Ou vous gardez votre configuration actuelle : les deux fonctionnent.",
    },
    Template {
        name: "pattern-interrupt",
        subject_line: "question rapide",
        email_1: "{greeting}Question rapide : quel outil utilisez-vous aujourd'hui pour \
                  l'outbound chez {company} ?\n\nSi c'est une plateforme mutualisée, vous partagez \
                  votre réputation d'envoi avec des centaines d'autres entreprises.\n\nCurieux de \
                  voir la différence avec une infrastructure dédiée ?",
        email_2: "Infrastructure partagée : vous payez pour user votre réputation.\n\n\
                  Infrastructure dédiée : vous payez pour la construire.\n\nLaquelle a le plus \
                  de sens pour vous ?",
        email_3: "Je ferme la boucle ici.\n\nSi vous voulez comparer une infrastructure dédiée à \
                  votre configuration actuelle, faites-moi signe. Bonne continuation.",
    },
];

/// Picks one of the built-in sequences from a hash of the company domain, so a
/// given company always receives the same variant.
pub struct TemplateCopywriter {
    sender_name: Option<String>,
}

impl TemplateCopywriter {
    pub fn new(sender_name: Option<String>) -> Self {
        Self { sender_name }
    }

    fn render(&self, text: &str, prospect: &Prospect) -> String {
        let greeting = match prospect.first_name.as_deref().map(str::trim) {
            Some(first) if !first.is_empty() => format!("{first},\n\n"),
            _ => String::new(),
        };
        let body = text
            .replace("{greeting}", &greeting)
            .replace("{company}", &prospect.company_name);
        match &self.sender_name {
            Some(sender) => format!("{body}\n\n{sender}"),
            None => body,
        }
    }
}

#[async_trait]
impl CopyGenerator for TemplateCopywriter {
    async fn generate(&self, prospect: &Prospect) -> Result<EmailSequence> {
        let template = pick(&prospect.company_domain);
        debug!(domain = %prospect.company_domain, variant = template.name, "template selected");

        let sequence = EmailSequence {
            subject_line: template.subject_line.to_string(),
            email_1: self.render(template.email_1, prospect),
            email_1_ps: None,
            email_2: self.render(template.email_2, prospect),
            email_3: self.render(template.email_3, prospect),
        };
        sequence.validate()?;
        Ok(sequence)
    }
}

fn pick(domain: &str) -> &'static Template {
    let digest = Sha256::digest(domain.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let index = u64::from_be_bytes(head) % TEMPLATES.len() as u64;
    &TEMPLATES[index as usize]
}
