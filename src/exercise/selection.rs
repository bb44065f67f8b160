// Selection inputs for content generation
//
// The learner picks a question type, a test part, a level and a topic before
// a session starts. Each part has its own fixed topic catalog and "Random"
// is always available.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Topic that lets the generator pick a realistic topic for the part
pub const RANDOM_TOPIC: &str = "Random";

const PART_1_TOPICS: &[&str] = &[
    "Booking & Reservations",
    "Memberships & Enrolment",
    "Service Inquiries",
    "Accommodation & Housing",
    "Lost or Damaged Items",
    "Volunteering & Charities",
    "Surveys & Interviews",
    RANDOM_TOPIC,
];

const PART_2_TOPICS: &[&str] = &[
    "Local Facilities & Community Services",
    "Tourist Attractions & Site Tours",
    "Events & Festivals",
    "Improvements & Renovations",
    RANDOM_TOPIC,
];

const PART_3_TOPICS: &[&str] = &[
    "The Assignment Discussion",
    "The Tutor Tutorial",
    "Research Project Planning",
    "Course Feedback or Selection",
    RANDOM_TOPIC,
];

const PART_4_TOPICS: &[&str] = &[
    "The Natural World & Biology",
    "History and Archaeology",
    "Business and Management",
    "Psychology and Human Behavior",
    "Physical Sciences & Technology",
    RANDOM_TOPIC,
];

/// Question category requested from the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    /// Sentence completion
    Sentence,
    /// Note/form completion
    #[default]
    Note,
    /// Multiple choice
    Mcq,
    /// A mix of the atomic types
    Mixed,
}

/// Listening test part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestPart {
    #[default]
    #[serde(rename = "PART_1")]
    Part1,
    #[serde(rename = "PART_2")]
    Part2,
    #[serde(rename = "PART_3")]
    Part3,
    #[serde(rename = "PART_4")]
    Part4,
}

impl TestPart {
    /// Part number (1-4)
    pub fn number(&self) -> u8 {
        match self {
            TestPart::Part1 => 1,
            TestPart::Part2 => 2,
            TestPart::Part3 => 3,
            TestPart::Part4 => 4,
        }
    }

    /// Wire identifier used by the generator and report ("PART_1")
    pub fn identifier(&self) -> &'static str {
        match self {
            TestPart::Part1 => "PART_1",
            TestPart::Part2 => "PART_2",
            TestPart::Part3 => "PART_3",
            TestPart::Part4 => "PART_4",
        }
    }

    /// Topics offered for this part
    pub fn topics(&self) -> &'static [&'static str] {
        match self {
            TestPart::Part1 => PART_1_TOPICS,
            TestPart::Part2 => PART_2_TOPICS,
            TestPart::Part3 => PART_3_TOPICS,
            TestPart::Part4 => PART_4_TOPICS,
        }
    }
}

/// Complexity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "A1-A2")]
    A1A2,
    #[serde(rename = "B1-B2")]
    B1B2,
    #[serde(rename = "C1-C2")]
    C1C2,
    #[default]
    #[serde(rename = "OFFICIAL")]
    Official,
}

impl Level {
    /// Label shown next to the part in the player header
    pub fn display_name(&self) -> &'static str {
        match self {
            Level::A1A2 => "A1-A2",
            Level::B1B2 => "B1-B2",
            Level::C1C2 => "C1-C2",
            Level::Official => "Official IELTS",
        }
    }
}

/// Selection passed to the content generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub question_type: QuestionType,
    pub part: TestPart,
    pub level: Level,
    pub topic: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            question_type: QuestionType::default(),
            part: TestPart::default(),
            level: Level::default(),
            topic: RANDOM_TOPIC.to_string(),
        }
    }
}

impl Selection {
    pub fn new(question_type: QuestionType, part: TestPart, level: Level, topic: &str) -> Self {
        Self {
            question_type,
            part,
            level,
            topic: topic.to_string(),
        }
    }

    /// Switch part and reset the topic to "Random", as the part picker does
    pub fn with_part(mut self, part: TestPart) -> Self {
        self.part = part;
        self.topic = RANDOM_TOPIC.to_string();
        self
    }

    pub fn is_random_topic(&self) -> bool {
        self.topic == RANDOM_TOPIC
    }

    /// Reject topics that do not belong to the selected part
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.part.topics().contains(&self.topic.as_str()) {
            Ok(())
        } else {
            Err(SessionError::InvalidSelection {
                reason: format!(
                    "topic '{}' is not offered for {}",
                    self.topic,
                    self.part.identifier()
                ),
            })
        }
    }
}

/// Learner identity printed on the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub display_name: String,
    pub test_number: String,
}

impl SessionIdentity {
    pub fn new(display_name: &str, test_number: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            test_number: test_number.to_string(),
        }
    }

    /// Replace blank fields with the configured defaults
    pub fn resolved(&self, default_name: &str, default_number: &str) -> Self {
        let pick = |value: &str, fallback: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                fallback.to_string()
            } else {
                trimmed.to_string()
            }
        };
        Self {
            display_name: pick(&self.display_name, default_name),
            test_number: pick(&self.test_number, default_number),
        }
    }
}

/// Everything needed to start a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub selection: Selection,
    pub identity: SessionIdentity,
}

impl StartRequest {
    pub fn new(selection: Selection, identity: SessionIdentity) -> Self {
        Self {
            selection,
            identity,
        }
    }
}
