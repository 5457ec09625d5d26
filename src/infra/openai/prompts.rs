//! Prompt text for the insight stage.

pub const ANALYST_SYSTEM: &str = "You are an expert spatial data analyst.";
pub const CARTOGRAPHER_SYSTEM: &str = "You are an expert cartographer and GIS specialist.";

pub fn data_analysis(data_summary: &str) -> String {
    format!(
        "You are a spatial data analyst specializing in bike-sharing systems.
Analyze the following bike-share station data and provide insights:

{data_summary}

Please provide:
1. Key patterns and trends in station utilization
2. Geographic clusters of high/low availability
3. Recommendations for optimal station placement
4. Potential issues or anomalies
5. Suggestions for improving the bike-sharing system

Format your response in clear sections with actionable insights."
    )
}

pub fn map_design(analysis: &str, data_summary: &str) -> String {
    format!(
        "You are a cartographic expert. Based on the following analysis of bike-share station data:

ANALYSIS RESULTS:
{analysis}

DATA SUMMARY:
{data_summary}

Provide recommendations for creating an effective map visualization:
1. Suggested symbology (colors, sizes, styles) for different data attributes
2. Layer organization and hierarchy
3. Classification methods (natural breaks, quantile, etc.)
4. Legend design recommendations
5. Layout suggestions (title, scale, north arrow placement)
6. Color schemes that highlight patterns effectively

Format your response as structured recommendations that can be implemented in a desktop GIS."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_inputs() {
        let p = data_analysis("Total Stations: 3");
        assert!(p.contains("\n\nTotal Stations: 3\n\n"));

        let p = map_design("clusters downtown", "Total Stations: 3");
        assert!(p.contains("ANALYSIS RESULTS:\nclusters downtown"));
        assert!(p.contains("DATA SUMMARY:\nTotal Stations: 3"));
    }
}
