// All prompt text for the communications pipeline.
// The task templates are the business requirements for each channel; edit with care.

use crate::models::disruption::DisruptionRecord;

/// System instructions shared by all four channels.
pub const SYSTEM_PROMPT: &str = "You are a communications specialist for a major airline. \
Your role is to draft clear, empathetic, and professional messages for passengers and staff during flight disruptions.

Guidelines:
- Lead with the essential information (what happened, what's next)
- Acknowledge inconvenience without over-apologizing
- Provide specific, actionable next steps
- Maintain brand voice: professional, warm, solution-oriented
- Never speculate on causes beyond what's provided
- Include relevant reference numbers and contact points where appropriate";

fn status_upper(record: &DisruptionRecord) -> String {
    record.disruption_type.as_str().to_uppercase()
}

pub fn email_task(record: &DisruptionRecord) -> String {
    format!(
        "Generate a passenger notification email for the following flight disruption:

Flight: {flight}
Route: {origin} → {destination}
Original Departure: {original_time}
Disruption Type: {status}
Reason: {reason}
New Departure: {new_time}
Rebooking Options: {rebooking}
Compensation: {compensation}

Write a complete email including:
1. A clear subject line
2. Greeting
3. Explanation of the situation
4. What happens next (rebooking options as clear bullet points)
5. Compensation/amenities available
6. Contact information for further assistance
7. Professional closing

Tone: Apologetic but action-focused. Empathetic but efficient.",
        flight = record.flight_number,
        origin = record.origin,
        destination = record.destination,
        original_time = record.original_time,
        status = status_upper(record),
        reason = record.reason,
        new_time = record.new_time,
        rebooking = record.rebooking_options,
        compensation = record.compensation_details,
    )
}

pub fn sms_task(record: &DisruptionRecord) -> String {
    format!(
        "Generate a brief SMS/text notification (MUST be under 160 characters) for:

Flight: {flight}
Route: {origin}→{destination}
Status: {status}
New Time: {new_time}

Requirements:
- Under 160 characters total
- Include flight number
- State the disruption clearly
- Include one action item
- End with where to get more info (app or counter)

Just output the SMS text, nothing else.",
        flight = record.flight_number,
        origin = record.origin,
        destination = record.destination,
        status = status_upper(record),
        new_time = record.new_time,
    )
}

pub fn gate_task(record: &DisruptionRecord) -> String {
    format!(
        "Generate talking points for gate agents handling flight {flight}:

Flight: {flight}
Route: {origin} → {destination}
Disruption: {status}
Reason: {reason}
New Departure: {new_time}
Rebooking Options: {rebooking}
Meal Vouchers: {vouchers}
Hotel: {hotel}

Provide:
1. **PA ANNOUNCEMENT** - Script to read over intercom (2-3 sentences)
2. **KEY FACTS** - Bullet points of essential information
3. **ANTICIPATED QUESTIONS** - Top 5 passenger questions with suggested answers
4. **ESCALATION** - When and how to escalate angry passengers

Format clearly with headers.",
        flight = record.flight_number,
        origin = record.origin,
        destination = record.destination,
        status = status_upper(record),
        reason = record.reason,
        new_time = record.new_time,
        rebooking = record.rebooking_options,
        vouchers = record.voucher_policy,
        hotel = record.hotel_policy,
    )
}

pub fn social_task(record: &DisruptionRecord) -> String {
    format!(
        "Generate a Twitter/X response template (MUST be under 280 characters) for passengers complaining about:

Flight: {flight}
Issue: {issue}
Route: {origin} to {destination}

Requirements:
- Under 280 characters
- Acknowledge their frustration briefly
- Provide current status in few words
- Direct them to DM for personal help
- Professional but human tone
- Include ^[initials] at end (use ^TM)

Just output the tweet text, nothing else.",
        flight = record.flight_number,
        issue = record.disruption_type,
        origin = record.origin,
        destination = record.destination,
    )
}
