//! Assistant wording
//!
//! Every message the stage sequencer emits, plus the system prompt for the
//! model driver. Templates use `{name}` placeholders filled by [`render`];
//! unknown placeholders are left as written.

use serde::{Deserialize, Serialize};

/// Message templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    pub welcome: String,
    pub ask_location: String,
    /// `{city}`
    pub location_served: String,
    pub location_unserved: String,
    pub ask_headcount: String,
    pub ask_frequency: String,
    pub ask_preferences: String,
    pub ask_preferences_after_frequency: String,
    /// `{city}`, `{restaurant_count}`
    pub showcase_intro: String,
    /// `{name}`, `{description}`
    pub showcase_item: String,
    /// `{city}`, `{restaurant_count}`; used when no partner is listed
    pub showcase_no_partners: String,
    pub showcase_outro: String,
    pub showcase_unserved: String,
    pub ask_email: String,
    /// `{sales_email}`
    pub decline: String,
    /// `{email}`, `{location}`, `{need}`, `{headcount}`, `{timing}`
    pub summary: String,
    pub closing: String,
    /// `{service_areas}`, `{minimum_order_size}`, `{lead_time_hours}`,
    /// `{sales_email}`
    pub system_prompt: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            welcome: "Hi! Welcome to Meal Outpost. I'm here to help you figure out if we can support your catering needs.\n\n\
                      What brings you to Meal Outpost today?\n\n\
                      Are you looking for:\n\
                      • One-time catering for a meeting or event?\n\
                      • A recurring meal program (daily/weekly lunches)?\n\
                      • Just exploring your options?"
                .to_string(),
            ask_location: "Great! Where are you looking to get catering? What city are you in?"
                .to_string(),
            location_served: "Perfect! We serve {city} and have great restaurant partners there.\n\n\
                              When are you looking to have catering?"
                .to_string(),
            location_unserved: "I appreciate you sharing that! We don't currently serve that area, but I'd still love to learn more about your needs. \
                                We're always expanding, and I can connect you with our team.\n\n\
                                When are you looking to have catering?"
                .to_string(),
            ask_headcount: "Got it! How many people are you looking to feed?".to_string(),
            ask_frequency: "And how often would you need catering? Daily, weekly, or something else?"
                .to_string(),
            ask_preferences: "Thanks! Do you have any cuisine preferences or dietary requirements? (e.g., Italian, vegetarian, gluten-free)"
                .to_string(),
            ask_preferences_after_frequency: "Perfect! Do you have any cuisine preferences or dietary requirements? (e.g., Italian, vegetarian, gluten-free)"
                .to_string(),
            showcase_intro: "Great choices! In {city}, we work with {restaurant_count}+ restaurant partners, including some that could be perfect for you:"
                .to_string(),
            showcase_item: "• **{name}** - {description}".to_string(),
            showcase_no_partners: "Great choices! In {city}, we work with {restaurant_count}+ restaurant partners."
                .to_string(),
            showcase_outro: "Plus many other partners in your area! We can match you with the perfect fit for your needs.\n\n\
                             Would you like me to connect you with our team who can provide personalized recommendations and pricing?"
                .to_string(),
            showcase_unserved: "Based on what you've shared, this sounds like a great fit for the type of service we provide! \
                                Even though we don't serve your area yet, we're always expanding.\n\n\
                                Would you like me to connect you with our team? They can discuss potential options or keep you updated on when we expand to your region."
                .to_string(),
            ask_email: "Perfect! What's the best email address to reach you at?\n\n\
                        (Our team typically responds within a few hours during business hours)"
                .to_string(),
            decline: "No problem! If you change your mind, you can always reach our team at {sales_email}.\n\n\
                      Is there anything else I can help you understand about Meal Outpost?"
                .to_string(),
            summary: "Thanks, {email}! I've notified our team about your catering needs.\n\n\
                      Here's a quick summary:\n\
                      - Location: {location}\n\
                      - Need: {need}\n\
                      - Group size: {headcount} people\n\
                      - Timing: {timing}\n\n\
                      Someone from our team will reach out to you within 24 hours!\n\n\
                      Is there anything else you'd like to know in the meantime?"
                .to_string(),
            closing: "Perfect! Thanks so much for chatting with me today. Our team has all your details and will be in touch soon.\n\n\
                      Have a great day! 🎉"
                .to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are MO, a friendly assistant for Meal Outpost, a catering marketplace that connects businesses, universities, government buildings, sports teams, and other organizations with local restaurant partners.

Your job is to understand a visitor's catering needs and, when it makes sense, connect them with the sales team.

CONVERSATION FLOW (one question at a time):
1. Understand the need: one-time event, recurring meal program, or just exploring. Record it with record_requirements.
2. Ask for the city and check it with check_service_area.
3. Ask when they need catering.
4. Ask how many people and check it with check_order_minimum.
5. For recurring programs, ask how often.
6. Ask about cuisine preferences and dietary needs, then show partners with find_restaurant_partners.
7. Offer to connect them with the team. If they agree, ask for their email and call send_lead_notification.

SERVICE AREAS: {service_areas}

RULES:
- We prefer {minimum_order_size}+ people per order but capture smaller leads too.
- Lead time is {lead_time_hours} hours for one-time orders and 1-2 weeks for program setup.
- Never quote prices, delivery fees or contract terms. For pricing, point them to {sales_email}.
- Stay helpful when they are outside the service area or below the minimum: we're expanding and would love to stay in touch.
- Always use the tools for service-area and partner facts. Never invent restaurants.";

/// Fill `{key}` placeholders
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}
