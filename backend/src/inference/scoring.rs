use shared::{EmotionClass, EmotionScores};

/// Index of the largest score. The first of several equal maxima wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

pub fn top_prediction(scores: &[f32]) -> Option<(EmotionClass, f32)> {
    let index = argmax(scores)?;
    EmotionClass::from_index(index).map(|class| (class, scores[index]))
}

fn to_percent(score: f32) -> i32 {
    (f64::from(score) * 100.0).round() as i32
}

/// Converts one score per class into rounded percentages under presentation names.
pub fn emotion_percentages(scores: &[f32]) -> Option<EmotionScores> {
    let percent = |class: EmotionClass| scores.get(class.index()).copied().map(to_percent);
    Some(EmotionScores {
        neutral: percent(EmotionClass::Relaxed)?,
        anger: percent(EmotionClass::Angry)?,
        happiness: percent(EmotionClass::Happy)?,
        sadness: percent(EmotionClass::Sad)?,
    })
}
