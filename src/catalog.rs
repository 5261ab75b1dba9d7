//! Lead catalog: the static roster of prospects and their call scripts.
//!
//! The catalog is supplied at process start (JSON, or the built-in demo
//! set) and is read-only from the engine's perspective, except for two
//! fields the session updates when a wrap-up completes: `status` and
//! `next_action`.

use crate::error::{CallError, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a lead within the calling campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadStatus {
    /// Never contacted.
    New,
    /// Contact underway.
    InProgress,
    /// Needs a follow-up touch.
    FollowUp,
    /// Call completed and wrapped up.
    Completed,
}

/// One scripted talking point: an agent prompt plus the customer signals
/// the agent should expect to hear back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Step identifier, unique within a lead's script.
    pub id: String,
    /// Short title shown in step lists.
    pub title: String,
    /// What the agent says at this step.
    pub prompt: String,
    /// Expected customer responses, in preference order. Non-empty by
    /// construction; the script driver still tolerates an empty list.
    pub signals: Vec<String>,
}

/// A prospective contact targeted for an outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Stable lead identifier.
    pub id: String,
    /// Contact name.
    pub name: String,
    /// Employer.
    pub company: String,
    /// Job title.
    pub title: String,
    /// Direct phone number.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// Free-form qualification tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Static fit score in `0..=100`, assigned by research.
    pub confidence: u8,
    /// Campaign status. Mutated only by wrap-up completion.
    pub status: LeadStatus,
    /// Next planned action. Mutated only by wrap-up completion.
    pub next_action: String,
    /// Call objectives; seed the runtime task list as not-done.
    #[serde(default)]
    pub objectives: Vec<String>,
    /// Preparation already performed; seeds the task list as done.
    #[serde(default)]
    pub prep_notes: Vec<String>,
    /// Durable research notes; seed the runtime notes field.
    #[serde(default)]
    pub notes: String,
    /// Ordered call script.
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// Ordered, keyed collection of leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    leads: Vec<Lead>,
}

impl Catalog {
    /// Build a catalog from an ordered list of leads.
    pub fn new(leads: Vec<Lead>) -> Self {
        Self { leads }
    }

    /// Parse a catalog from JSON text (an array of lead records).
    pub fn from_json_str(text: &str) -> Result<Self> {
        let leads: Vec<Lead> =
            serde_json::from_str(text).map_err(|e| CallError::Catalog(e.to_string()))?;
        Ok(Self { leads })
    }

    /// Number of leads.
    pub fn len(&self) -> usize {
        self.leads.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Iterate leads in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Lead> {
        self.leads.iter()
    }

    /// First lead in catalog order, if any.
    pub fn first(&self) -> Option<&Lead> {
        self.leads.first()
    }

    /// Look up a lead by id.
    pub fn get(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    /// Mutable lookup, used by wrap-up completion only.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Lead> {
        self.leads.iter_mut().find(|l| l.id == id)
    }

    /// Built-in demo roster used by the host binary and as a test fixture.
    pub fn demo() -> Self {
        Self {
            leads: vec![
                Lead {
                    id: "lead-mercer".into(),
                    name: "Dana Mercer".into(),
                    company: "Hollybrook Logistics".into(),
                    title: "VP of Operations".into(),
                    phone: "+1 415 555 0114".into(),
                    email: "dana.mercer@hollybrook.example".into(),
                    tags: vec!["warm-intro".into(), "logistics".into()],
                    confidence: 72,
                    status: LeadStatus::New,
                    next_action: "Discovery call".into(),
                    objectives: vec![
                        "Confirm fleet size and routing stack".into(),
                        "Book a technical demo".into(),
                    ],
                    prep_notes: vec![
                        "Reviewed Q2 expansion press release".into(),
                        "Checked mutual connection with R. Ames".into(),
                    ],
                    notes: "Expanding into cold-chain freight; current router \
                            is end-of-life in November."
                        .into(),
                    script: vec![
                        ScriptStep {
                            id: "mercer-open".into(),
                            title: "Opener".into(),
                            prompt: "Hi Dana, this is the Calldeck team. Rachel Ames \
                                     suggested I reach out about your routing refresh."
                                .into(),
                            signals: vec![
                                "Oh right, Rachel mentioned you.".into(),
                                "I have a few minutes, go ahead.".into(),
                            ],
                        },
                        ScriptStep {
                            id: "mercer-pain".into(),
                            title: "Pain point".into(),
                            prompt: "I understand your current routing platform sunsets \
                                     in November. How is the migration planning going?"
                                .into(),
                            signals: vec![
                                "Honestly, we haven't started.".into(),
                                "We're evaluating two vendors.".into(),
                                "It's a sore subject.".into(),
                            ],
                        },
                        ScriptStep {
                            id: "mercer-close".into(),
                            title: "Demo ask".into(),
                            prompt: "We migrate fleets your size in under six weeks. \
                                     Could I book thirty minutes with your ops team?"
                                .into(),
                            signals: vec![
                                "Send me a calendar invite.".into(),
                                "Loop in our IT lead first.".into(),
                            ],
                        },
                    ],
                },
                Lead {
                    id: "lead-okafor".into(),
                    name: "Chidi Okafor".into(),
                    company: "Brightline Health".into(),
                    title: "Director of Patient Access".into(),
                    phone: "+1 312 555 0168".into(),
                    email: "c.okafor@brightline.example".into(),
                    tags: vec!["inbound".into(), "healthcare".into()],
                    confidence: 58,
                    status: LeadStatus::InProgress,
                    next_action: "Second touch".into(),
                    objectives: vec![
                        "Qualify budget cycle".into(),
                        "Identify the economic buyer".into(),
                    ],
                    prep_notes: vec!["Read their webinar recap on intake wait times".into()],
                    notes: "Downloaded the scheduling whitepaper twice; compliance \
                            review is the usual blocker in this segment."
                        .into(),
                    script: vec![
                        ScriptStep {
                            id: "okafor-open".into(),
                            title: "Opener".into(),
                            prompt: "Hi Chidi, following up on the scheduling whitepaper \
                                     you grabbed last week. Did it land with your team?"
                                .into(),
                            signals: vec![
                                "Yes, we circulated it internally.".into(),
                                "Remind me which one that was?".into(),
                            ],
                        },
                        ScriptStep {
                            id: "okafor-budget".into(),
                            title: "Budget".into(),
                            prompt: "Most access teams we work with budget this in Q4. \
                                     Is that how your planning cycle runs?"
                                .into(),
                            signals: vec![
                                "Q4 is right, but compliance signs off first.".into(),
                                "Budget is already allocated.".into(),
                            ],
                        },
                    ],
                },
                Lead {
                    id: "lead-silva".into(),
                    name: "Marta Silva".into(),
                    company: "Arpeggio Studios".into(),
                    title: "Head of Production".into(),
                    phone: "+44 20 7946 0810".into(),
                    email: "marta@arpeggio.example".into(),
                    tags: vec!["cold".into(), "media".into()],
                    confidence: 41,
                    status: LeadStatus::FollowUp,
                    next_action: "Re-engage after festival season".into(),
                    objectives: vec!["Revive the stalled pilot conversation".into()],
                    prep_notes: vec![
                        "Pilot stalled in March over licensing terms".into(),
                        "New procurement contact since June".into(),
                    ],
                    notes: "Previous pilot died on licensing, not product fit. \
                            New procurement lead may reopen the door."
                        .into(),
                    script: vec![
                        ScriptStep {
                            id: "silva-open".into(),
                            title: "Re-open".into(),
                            prompt: "Marta, we spoke in March before festival season \
                                     swallowed your calendar. Is now a better moment?"
                                .into(),
                            signals: vec![
                                "Barely, but go on.".into(),
                                "March feels like a decade ago.".into(),
                            ],
                        },
                        ScriptStep {
                            id: "silva-terms".into(),
                            title: "Licensing".into(),
                            prompt: "The licensing terms that blocked the pilot changed \
                                     in our summer release. Worth a fresh look?"
                                .into(),
                            signals: vec![
                                "That was the whole problem, yes.".into(),
                                "Send the new terms over.".into(),
                            ],
                        },
                        ScriptStep {
                            id: "silva-pilot".into(),
                            title: "Pilot ask".into(),
                            prompt: "Could we restart the pilot with your new \
                                     procurement contact in the loop?"
                                .into(),
                            signals: vec!["Introduce yourself to them directly.".into()],
                        },
                    ],
                },
            ],
        }
    }
}

/// Blend a lead's static fit score with live script progress into a single
/// display percentage.
///
/// Display-only: never read by any control path. The static score keeps its
/// weight; completed script steps recover up to 40% of the remaining
/// headroom.
pub fn live_confidence(lead: &Lead, script_cursor: usize) -> u8 {
    let base = f32::from(lead.confidence.min(100));
    if lead.script.is_empty() {
        return base as u8;
    }
    let progress = script_cursor.min(lead.script.len()) as f32 / lead.script.len() as f32;
    let blended = base + progress * (100.0 - base) * 0.4;
    blended.round().min(100.0) as u8
}
